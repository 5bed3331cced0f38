//! LM Studio serves an OpenAI-compatible API, so listing reuses the OpenAI client
//! with a placeholder credential.

use async_trait::async_trait;
use std::time::Duration;

use crate::providers::openai::OpenAIClient;
use crate::providers::{
    providers::ProviderIdentifier, Error, Model, ModelLister, NamingScheme, Url,
};

/// The credential LM Studio expects. Any value is accepted.
pub(crate) const LM_STUDIO_API_KEY: &str = "lm-studio";

/// Lists the models loaded into a local LM Studio server.
pub(crate) struct LmStudioProvider {
    client: OpenAIClient,
}

impl LmStudioProvider {
    /// `api_base` is the OpenAI-compatible root, e.g. `http://localhost:1234/v1`.
    pub(crate) fn new(api_base: Url, timeout: Duration) -> Result<LmStudioProvider, Error> {
        Ok(LmStudioProvider {
            client: OpenAIClient::new(LM_STUDIO_API_KEY, api_base, timeout)?,
        })
    }
}

#[async_trait]
impl ModelLister for LmStudioProvider {
    fn id(&self) -> ProviderIdentifier {
        ProviderIdentifier::LmStudio
    }

    fn naming(&self) -> NamingScheme {
        NamingScheme::Flat
    }

    fn base_url(&self) -> Option<&Url> {
        Some(self.client.api_base())
    }

    async fn models(&self) -> Result<Vec<Model>, Error> {
        self.client.models().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ErrorKind;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn lists_loaded_models() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .and(header("authorization", "Bearer lm-studio"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "object": "list",
                "data": [
                    {"id": "qwen2.5-7b-instruct", "object": "model", "owned_by": "organization_owner"},
                    {"id": "text-embedding-nomic-embed-text-v1.5", "object": "model"}
                ]
            })))
            .mount(&server)
            .await;

        let base = Url::parse(&format!("{}/v1", server.uri())).unwrap();
        let provider = LmStudioProvider::new(base, Duration::from_secs(2)).unwrap();

        let models = provider.models().await.unwrap();

        assert_eq!(
            models,
            vec![
                Model::new("qwen2.5-7b-instruct"),
                Model::new("text-embedding-nomic-embed-text-v1.5")
            ]
        );
    }

    #[tokio::test]
    async fn unreachable_server_is_a_connection_error() {
        // Nothing listens on the discard port
        let base = Url::parse("http://127.0.0.1:9/v1").unwrap();
        let provider = LmStudioProvider::new(base, Duration::from_secs(2)).unwrap();

        let err = provider.models().await.unwrap_err();

        assert!(matches!(
            err.kind(),
            ErrorKind::Connection | ErrorKind::TimedOut
        ));
    }
}
