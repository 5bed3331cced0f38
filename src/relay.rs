//! The HTTP surface used by the frontend.
//!
//! Chat and judge requests name a model and may carry their own connection
//! parameters. Either way the model is first offered to the local backends through
//! the [`ProviderResolver`](crate::registry::ProviderResolver), and only when none of
//! them serve it does the request go out with the caller's (or the configured)
//! hosted parameters.
//!
//! | Route                        | |
//! |------------------------------|-------------------------------------------|
//! | `GET /health`                | liveness and server time                  |
//! | `POST /api/openai/chat/stream` | streamed completion as server-sent events |
//! | `POST /api/openai/judge`     | structured comparison of two outputs      |
//! | `POST /api/csv/fetch`        | fetch a remote CSV file                   |
//! | `GET /api/models`            | models currently available per backend    |
//!
//! Every other path serves the built frontend when there is one.

mod chat;
mod csv;
mod error;
mod health;
mod judge;
mod models;
mod route;
mod state;

use axum::http::{HeaderValue, Method};
use axum::routing::{any, get, post};
use axum::Router;
use serde::Serialize;
use std::path::Path;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

pub(crate) use self::error::Error;
pub(crate) use self::state::RelayState;

use crate::providers::Usage;

/// Token usage as reported to the frontend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
    total_tokens: u64,
}

impl From<Usage> for TokenUsage {
    fn from(value: Usage) -> Self {
        TokenUsage {
            prompt_tokens: value.prompt_tokens,
            completion_tokens: value.completion_tokens,
            total_tokens: value.total_tokens,
        }
    }
}

async fn not_found() -> Error {
    Error::NotFound
}

fn cors_layer(origin: &str) -> CorsLayer {
    if origin.trim() == "*" {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origin
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

/// Builds the router. When `static_dir` exists, unknown paths outside of `/api`
/// serve files from it and fall back to its `index.html`.
pub(crate) fn router(state: RelayState, cors_origin: &str, static_dir: &Path) -> Router {
    let router = Router::new()
        .route("/health", get(health::health))
        .route("/api/openai/chat/stream", post(chat::chat_stream))
        .route("/api/openai/judge", post(judge::judge))
        .route("/api/csv/fetch", post(csv::fetch_csv))
        .route("/api/models", get(models::list_models))
        .route("/api", any(not_found))
        .route("/api/{*rest}", any(not_found));

    let router = if static_dir.is_dir() {
        let index = static_dir.join("index.html");

        tracing::info!(dir = %static_dir.display(), "serving frontend");

        router.fallback_service(ServeDir::new(static_dir).fallback(ServeFile::new(index)))
    } else {
        router.fallback(not_found)
    };

    router
        .with_state(state)
        .layer(cors_layer(cors_origin))
        .layer(TraceLayer::new_for_http())
}

pub(crate) async fn serve(router: Router, host: &str, port: u16) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind((host, port)).await?;

    tracing::info!(address = %listener.local_addr()?, "relay listening");

    axum::serve(listener, router).await
}
