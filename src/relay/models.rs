use axum::extract::State;
use axum::Json;
use serde::Serialize;

use super::RelayState;
use crate::providers::providers::ProviderIdentifier;

#[derive(Debug, Serialize, PartialEq, Eq)]
pub(super) struct ProvidedModel {
    provider: ProviderIdentifier,
    model: String,
}

/// Every model the backends currently report, grouped by provider in resolution
/// order and sorted by name within a provider.
pub(super) async fn list_models(State(state): State<RelayState>) -> Json<Vec<ProvidedModel>> {
    let mut listing = Vec::new();

    for (provider, available) in state.resolver.available_models().await {
        let mut models: Vec<&String> = available.iter().collect();
        models.sort();

        listing.extend(models.into_iter().map(|model| ProvidedModel {
            provider,
            model: model.clone(),
        }));
    }

    Json(listing)
}

#[cfg(test)]
mod tests {
    use crate::providers::ErrorKind;
    use crate::registry::testing::{fake_resolver, Listing};
    use crate::relay::testing::{get, json};
    use crate::relay::{router, RelayState};
    use axum::http::StatusCode;
    use serde_json::json;
    use std::path::Path;

    #[tokio::test]
    async fn lists_every_provider() {
        let state = RelayState::for_tests(fake_resolver(
            Listing::Models(vec!["mistral:7b", "gemma:2b"]),
            "http://ollama.invalid/v1",
            Listing::Fails(ErrorKind::Connection),
            "http://lmstudio.invalid/v1",
        ));

        let (status, body) = get(router(state, "*", Path::new("/nonexistent")), "/api/models").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json(&body),
            json!([
                {"provider": "ollama", "model": "gemma"},
                {"provider": "ollama", "model": "gemma:2b"},
                {"provider": "ollama", "model": "mistral"},
                {"provider": "ollama", "model": "mistral:7b"},
                {"provider": "hosted", "model": "gpt-4o"}
            ])
        );
    }
}
