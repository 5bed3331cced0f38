use reqwest::{Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::providers::apireq::{self, Url};

#[derive(Debug, Error)]
pub(super) enum Error {
    #[error("invalid ollama endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    #[error("a request to ollama failed: {0}")]
    RequestFailed(#[from] apireq::ReqwestError),

    #[error("failed to query ollama resource: {0}")]
    NotFound(String),

    #[error("request to the ollama api failed: {0}")]
    BadRequest(String),

    #[error("ollama encountered an internal error: {0}")]
    InternalError(String),

    #[error("the ollama API returned an unspecified error: {0}")]
    UnspecifiedError(String),
}

// Structures to deserialize /api/tags. Only the name is needed, everything else
// Ollama reports about a tag (size, digest, details) is ignored.

#[derive(Debug, Deserialize)]
pub(super) struct Tag {
    /// Missing names become empty and are skipped by the provider
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct TagsList {
    models: Vec<Tag>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: String,
}

pub(super) struct OllamaApi {
    api_base: Url,
    client: reqwest::Client,
}

impl OllamaApi {
    pub(super) fn new(api_base: Url, timeout: Duration) -> Result<OllamaApi, Error> {
        Ok(OllamaApi {
            api_base,
            client: apireq::http_client(timeout)?,
        })
    }

    pub(super) fn api_base(&self) -> &Url {
        &self.api_base
    }

    async fn maybe_parse_api_error(res: Response) -> Result<Response, Error> {
        let status = res.status();

        if status.is_success() {
            return Ok(res);
        }

        // Ollama answers with {"error": "..."}, but a proxy in front of it may not
        let text = res.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ApiError>(&text) {
            Ok(err) => err.error,
            Err(_) if text.is_empty() => status.to_string(),
            Err(_) => text,
        };

        match status {
            StatusCode::NOT_FOUND => Err(Error::NotFound(message)),
            code => match code.as_u16() {
                400..=499 => Err(Error::BadRequest(message)),
                500..=599 => Err(Error::InternalError(message)),
                _ => Err(Error::UnspecifiedError(message)),
            },
        }
    }

    pub(super) async fn tags(&self) -> Result<Vec<Tag>, Error> {
        let url = apireq::endpoint(&self.api_base, "api/tags")?;

        let res = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::RequestFailed(e.into()))?;

        let res = Self::maybe_parse_api_error(res).await?;

        let tags: TagsList = res
            .json()
            .await
            .map_err(|e| Error::RequestFailed(e.into()))?;

        Ok(tags.models)
    }
}
