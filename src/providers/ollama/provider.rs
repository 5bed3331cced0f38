use async_trait::async_trait;
use std::time::Duration;

use super::api;
use crate::providers::apireq::Url;
use crate::providers::{
    providers::ProviderIdentifier, Error, ErrorKind, Model, ModelLister, NamingScheme,
};

impl From<api::Tag> for Model {
    fn from(value: api::Tag) -> Self {
        Model::new(value.name)
    }
}

impl From<api::Error> for Error {
    fn from(value: api::Error) -> Self {
        let kind = match &value {
            api::Error::RequestFailed(_) => None,
            api::Error::InvalidEndpoint(_) => Some(ErrorKind::BadRequest),
            api::Error::NotFound(_) => Some(ErrorKind::NotFound),
            api::Error::BadRequest(_) => Some(ErrorKind::BadRequest),
            api::Error::InternalError(_) => Some(ErrorKind::InternalError),
            api::Error::UnspecifiedError(_) => Some(ErrorKind::UnspecifiedError),
        };

        match value {
            api::Error::RequestFailed(err) => err.into(),
            value => Error::from_source(
                kind.unwrap_or(ErrorKind::UnspecifiedError),
                Box::new(value),
            ),
        }
    }
}

/// Lists the models pulled into a local Ollama daemon.
pub(crate) struct OllamaProvider {
    api: api::OllamaApi,
}

impl OllamaProvider {
    /// `host` is the daemon root, e.g. `http://localhost:11434`, not its `/v1` API.
    pub(crate) fn new(host: Url, timeout: Duration) -> Result<OllamaProvider, Error> {
        Ok(OllamaProvider {
            api: api::OllamaApi::new(host, timeout)?,
        })
    }
}

#[async_trait]
impl ModelLister for OllamaProvider {
    fn id(&self) -> ProviderIdentifier {
        ProviderIdentifier::Ollama
    }

    fn naming(&self) -> NamingScheme {
        NamingScheme::Tagged
    }

    fn base_url(&self) -> Option<&Url> {
        Some(self.api.api_base())
    }

    async fn models(&self) -> Result<Vec<Model>, Error> {
        let tags = self.api.tags().await?;

        Ok(tags
            .into_iter()
            .filter(|t| !t.name.is_empty())
            .map(Model::from)
            .collect())
    }
}
