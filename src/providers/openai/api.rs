use bytes::Bytes;
use futures_core::Stream;
use reqwest::{RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::providers::apireq::{self, EventStream, ReqwestResponseStreamExt, Url};

#[derive(thiserror::Error, Debug)]
pub(crate) enum Error {
    /// Endpoint URL is invalid
    #[error("invalid endpoint")]
    InvalidEndpoint(
        #[from]
        #[source]
        url::ParseError,
    ),

    /// A bad response: the parser failed to parse the response stream
    #[error("failed to parse streamed response")]
    StreamParser(
        #[from]
        #[source]
        apireq::EventStreamError,
    ),

    /// Some issue with the request
    #[error("{}", .0)]
    RequestFailed(
        #[from]
        #[source]
        apireq::ReqwestError,
    ),

    /// Your request was malformed or missing some required parameters,
    /// such as a token or an input.
    #[error("{}", .0.message)]
    BadRequest(ApiErrorPayload),

    /// Invalid authentication, an incorrect API key, or an account that is not
    /// part of an organization.
    #[error("{}", .0.message)]
    Authentication(ApiErrorPayload),

    /// You don't have access to the requested resource.
    #[error("{}", .0.message)]
    PermissionDenied(ApiErrorPayload),

    /// Requested resource does not exist.
    #[error("{}", .0.message)]
    NotFound(ApiErrorPayload),

    /// The resource was updated by another request.
    #[error("{}", .0.message)]
    Conflict(ApiErrorPayload),

    /// Unable to process the request despite the format being correct.
    #[error("{}", .0.message)]
    UnprocessableEntity(ApiErrorPayload),

    /// You have hit your assigned rate limit.
    #[error("{}", .0.message)]
    RateLimit(ApiErrorPayload),

    /// The provider has an internal issue
    #[error("{}", .0.message)]
    InternalError(ApiErrorPayload),

    /// The engine is currently overloaded, please try again later
    #[error("{}", .0.message)]
    ApiOverloaded(ApiErrorPayload),

    /// Some unknown error was returned by the API
    #[error("{}", .0.message)]
    UnknownStatus(ApiErrorPayload),
}

impl Error {
    fn from_status(status: u16, payload: ApiErrorPayload) -> Error {
        match status {
            400 => Error::BadRequest(payload),
            401 => Error::Authentication(payload),
            403 => Error::PermissionDenied(payload),
            404 => Error::NotFound(payload),
            409 => Error::Conflict(payload),
            422 => Error::UnprocessableEntity(payload),
            429 => Error::RateLimit(payload),
            500 => Error::InternalError(payload),
            503 => Error::ApiOverloaded(payload),
            _ => Error::UnknownStatus(payload),
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub(super) enum Role {
    System,
    User,
}

#[derive(Serialize, Debug)]
pub(super) struct ChatMessage {
    pub content: String,
    pub role: Role,
}

/* Structures to deserialize /models */

#[derive(Deserialize, Debug)]
pub(super) struct ModelEntry {
    #[serde(default)]
    pub id: String,
}

#[derive(Deserialize, Debug)]
struct ModelList {
    data: Vec<ModelEntry>,
}

/* Structures to serialize /chat/completions */

#[derive(Serialize, Debug)]
struct StreamOptions {
    include_usage: bool,
}

#[derive(Serialize, Debug)]
struct ChatCompletionRequest<'o> {
    model: &'o str,
    messages: &'o [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_options: Option<StreamOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<&'o serde_json::Value>,
}

/* Structures to deserialize /chat/completions */

#[derive(Deserialize, Debug, Default)]
pub(super) struct Delta {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub(super) struct ChunkChoice {
    #[serde(default)]
    pub delta: Delta,
}

#[derive(Deserialize, Debug, Clone, Copy, Default)]
pub(super) struct Usage {
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

// Azure sends an initial chunk with only content filter results, so every
// field is optional.
#[derive(Deserialize, Debug)]
pub(super) struct ChatCompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Deserialize, Debug)]
pub(super) struct CompletionMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Deserialize, Debug)]
pub(super) struct CompletionChoice {
    pub message: CompletionMessage,
}

#[derive(Deserialize, Debug)]
pub(super) struct ChatCompletion {
    pub choices: Vec<CompletionChoice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

/* API Errors */

#[derive(Deserialize, Debug)]
pub(crate) struct ApiErrorPayload {
    message: String,
    #[serde(rename = "type", default)]
    typ: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorResponse {
    error: ApiErrorPayload,
}

pub(super) struct StreamingChatResponse<S>
where
    S: Stream<Item = reqwest::Result<Bytes>> + Unpin,
{
    stream: EventStream<S>,
}

impl<S: Stream<Item = reqwest::Result<Bytes>> + Unpin> StreamingChatResponse<S> {
    pub(super) async fn next(&mut self) -> Option<Result<ChatCompletionChunk, Error>> {
        let chunk = self.stream.next::<ChatCompletionChunk>().await;

        chunk.map(|r| r.map_err(Error::from))
    }
}

pub(super) struct OpenAIApi {
    api_base: Url,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAIApi {
    pub(super) fn new(api_key: &str, api_base: Url, timeout: Duration) -> Result<OpenAIApi, Error> {
        Ok(OpenAIApi {
            api_base,
            api_key: api_key.to_string(),
            client: apireq::http_client(timeout)?,
        })
    }

    pub(super) fn api_base(&self) -> &Url {
        &self.api_base
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        if self.api_key.is_empty() {
            req
        } else {
            req.bearer_auth(&self.api_key)
        }
    }

    async fn check_status(res: Response) -> Result<Response, Error> {
        let status = res.status();

        if status.is_success() {
            return Ok(res);
        }

        let text = res.text().await.unwrap_or_default();
        let payload = match serde_json::from_str::<ApiErrorResponse>(&text) {
            Ok(err) => err.error,
            Err(_) => ApiErrorPayload {
                message: if text.is_empty() {
                    status.to_string()
                } else {
                    text
                },
                typ: None,
            },
        };

        tracing::debug!(
            status = status.as_u16(),
            error_type = payload.typ.as_deref().unwrap_or("unknown"),
            "API returned an error"
        );

        Err(Error::from_status(status.as_u16(), payload))
    }

    pub(super) async fn models(&self) -> Result<Vec<ModelEntry>, Error> {
        let url = apireq::endpoint(&self.api_base, "models")?;

        let res = self
            .authorized(self.client.get(url))
            .send()
            .await
            .map_err(|e| Error::RequestFailed(e.into()))?;

        let res = Self::check_status(res).await?;

        let list: ModelList = res
            .json()
            .await
            .map_err(|e| Error::RequestFailed(e.into()))?;

        Ok(list.data)
    }

    pub(super) async fn streaming_chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<StreamingChatResponse<impl Stream<Item = reqwest::Result<Bytes>> + Unpin>, Error>
    {
        let url = apireq::endpoint(&self.api_base, "chat/completions")?;

        let res = self
            .authorized(self.client.post(url))
            .json(&ChatCompletionRequest {
                model,
                messages,
                stream: true,
                stream_options: Some(StreamOptions {
                    include_usage: true,
                }),
                response_format: None,
            })
            .send()
            .await
            .map_err(|e| Error::RequestFailed(e.into()))?;

        let res = Self::check_status(res).await?;

        Ok(StreamingChatResponse {
            stream: res.event_stream(),
        })
    }

    pub(super) async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
        response_format: Option<&serde_json::Value>,
    ) -> Result<ChatCompletion, Error> {
        let url = apireq::endpoint(&self.api_base, "chat/completions")?;

        let res = self
            .authorized(self.client.post(url))
            .json(&ChatCompletionRequest {
                model,
                messages,
                stream: false,
                stream_options: None,
                response_format,
            })
            .send()
            .await
            .map_err(|e| Error::RequestFailed(e.into()))?;

        let res = Self::check_status(res).await?;

        res.json()
            .await
            .map_err(|e| Error::RequestFailed(e.into()))
    }
}
