use axum::extract::State;
use axum::http::header::HeaderName;
use axum::response::sse::Event;
use axum::response::{IntoResponse, Sse};
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::route::route_request;
use super::{Error, RelayState, TokenUsage};
use crate::chat::{self, Message};
use crate::providers::{AsyncMessageIterator, OpenAIClient};

/// Marks the end of the stream, after the usage event.
const DONE: &str = "[DONE]";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ChatRequest {
    prompt: String,
    #[serde(default)]
    system_prompt: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default, rename = "baseURL")]
    base_url: Option<String>,
    #[serde(default)]
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum StreamEvent {
    Content { content: String },
    Usage { usage: TokenUsage },
    Error { error: String },
}

impl StreamEvent {
    fn into_event(self) -> Result<Event, axum::Error> {
        Event::default().json_data(self)
    }
}

type EventSender = mpsc::Sender<Result<Event, axum::Error>>;

/// Streams the completion as `content` events, then a `usage` event and `[DONE]`.
/// A failure at any point ends the stream with an `error` event instead.
pub(super) async fn chat_stream(
    State(state): State<RelayState>,
    Json(request): Json<ChatRequest>,
) -> Result<impl IntoResponse, Error> {
    let (route, client) = route_request(
        &state,
        request.model.as_deref(),
        request.base_url.as_deref(),
        request.api_key.as_deref(),
    )
    .await?;

    let messages = chat::single_turn(request.system_prompt.as_deref(), request.prompt);

    let (tx, rx) = mpsc::channel(32);

    tokio::spawn(forward_completion(client, route.model, messages, tx));

    Ok((
        [(HeaderName::from_static("x-accel-buffering"), "no")],
        Sse::new(ReceiverStream::new(rx)),
    ))
}

async fn forward_completion(
    client: OpenAIClient,
    model: String,
    messages: Vec<Message>,
    tx: EventSender,
) {
    let mut stream = match client.stream_completion(&model, &messages).await {
        Ok(stream) => stream,
        Err(err) => {
            send_error(&tx, err.to_string()).await;
            return;
        }
    };

    while let Some(delta) = stream.next().await {
        match delta {
            Ok(delta) => {
                let event = StreamEvent::Content {
                    content: delta.content,
                };

                if tx.send(event.into_event()).await.is_err() {
                    // Dropping the stream closes the upstream connection
                    tracing::debug!(model = %model, "client disconnected, stopping the stream");
                    return;
                }
            }
            Err(err) => {
                send_error(&tx, err.to_string()).await;
                return;
            }
        }
    }

    let usage = StreamEvent::Usage {
        usage: stream.usage().into(),
    };

    if tx.send(usage.into_event()).await.is_ok() {
        let _ = tx.send(Ok(Event::default().data(DONE))).await;
    }
}

async fn send_error(tx: &EventSender, error: String) {
    tracing::warn!(error = %error, "chat completion failed");

    let _ = tx.send(StreamEvent::Error { error }.into_event()).await;
}
