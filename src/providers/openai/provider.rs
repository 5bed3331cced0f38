use async_trait::async_trait;
use bytes::Bytes;
use futures_core::Stream;
use std::time::Duration;

use crate::chat::{Message, Role};
use crate::providers::apireq::Url;
use crate::providers::{
    openai::api, providers::ProviderIdentifier, AsyncMessageIterator, Completion, Error,
    ErrorKind, MessageDelta, Model, ModelLister, NamingScheme, Usage,
};

impl From<api::Error> for Error {
    fn from(value: api::Error) -> Self {
        let kind = match &value {
            api::Error::Authentication(_) | api::Error::PermissionDenied(_) => {
                Some(ErrorKind::Authentication)
            }
            api::Error::BadRequest(_)
            | api::Error::InvalidEndpoint(_)
            | api::Error::UnprocessableEntity(_) => Some(ErrorKind::BadRequest),
            // Request invalidated by a race condition
            api::Error::Conflict(_) => Some(ErrorKind::BadRequest),
            api::Error::InternalError(_) => Some(ErrorKind::InternalError),
            api::Error::NotFound(_) => Some(ErrorKind::NotFound),
            api::Error::RateLimit(_) => Some(ErrorKind::ExcessUsage),
            api::Error::UnknownStatus(_) => Some(ErrorKind::UnspecifiedError),
            api::Error::ApiOverloaded(_) => Some(ErrorKind::ApiOverloaded),

            api::Error::RequestFailed(_) => None,
            api::Error::StreamParser(_) => None,
        };

        match value {
            api::Error::RequestFailed(err) => err.into(),
            api::Error::StreamParser(err) => err.into(),
            value => Error::from_source(
                kind.unwrap_or(ErrorKind::UnspecifiedError),
                Box::new(value),
            ),
        }
    }
}

impl From<Role> for api::Role {
    fn from(value: Role) -> Self {
        match value {
            Role::System => api::Role::System,
            Role::User => api::Role::User,
        }
    }
}

impl From<api::Usage> for Usage {
    fn from(value: api::Usage) -> Self {
        Usage {
            prompt_tokens: value.prompt_tokens,
            completion_tokens: value.completion_tokens,
            total_tokens: value.total_tokens,
        }
    }
}

impl From<api::ModelEntry> for Model {
    fn from(value: api::ModelEntry) -> Self {
        Model::new(value.id)
    }
}

fn to_api_messages(messages: &[Message]) -> Vec<api::ChatMessage> {
    messages
        .iter()
        .map(|m| api::ChatMessage {
            role: m.role.into(),
            content: m.content.clone(),
        })
        .collect()
}

struct OpenAICompletionResponse<S>
where
    S: Stream<Item = reqwest::Result<Bytes>> + Unpin,
{
    inner: api::StreamingChatResponse<S>,
    usage: Usage,
}

impl<S: Stream<Item = reqwest::Result<Bytes>> + Unpin + Send> OpenAICompletionResponse<S> {
    fn new(inner: api::StreamingChatResponse<S>) -> OpenAICompletionResponse<S> {
        OpenAICompletionResponse {
            inner,
            usage: Usage::default(),
        }
    }
}

#[async_trait]
impl<S: Stream<Item = reqwest::Result<Bytes>> + Unpin + Send> AsyncMessageIterator
    for OpenAICompletionResponse<S>
{
    async fn next(&mut self) -> Option<Result<MessageDelta, Error>> {
        loop {
            let chunk = match self.inner.next().await? {
                Ok(chunk) => chunk,
                Err(err) => return Some(Err(err.into())),
            };

            if let Some(usage) = chunk.usage {
                self.usage = usage.into();
            }

            // Role announcements, finish markers, content filter results and the
            // trailing usage chunk carry no text.
            let content: String = chunk
                .choices
                .into_iter()
                .filter_map(|c| c.delta.content)
                .collect();

            if content.is_empty() {
                continue;
            }

            return Some(Ok(MessageDelta { content }));
        }
    }

    fn usage(&self) -> Usage {
        self.usage
    }
}

/// A client for an OpenAI-compatible chat completion API. Every backend the
/// relay routes to (Ollama's `/v1`, LM Studio, or a hosted deployment) speaks
/// this protocol.
pub(crate) struct OpenAIClient {
    api: api::OpenAIApi,
}

impl OpenAIClient {
    pub(crate) fn new(api_key: &str, api_base: Url, timeout: Duration) -> Result<OpenAIClient, Error> {
        Ok(OpenAIClient {
            api: api::OpenAIApi::new(api_key, api_base, timeout)?,
        })
    }

    pub(crate) fn api_base(&self) -> &Url {
        self.api.api_base()
    }

    /// Lists the models served at `{api_base}/models`.
    pub(crate) async fn models(&self) -> Result<Vec<Model>, Error> {
        let models = self.api.models().await?;

        Ok(models
            .into_iter()
            .filter(|m| !m.id.is_empty())
            .map(Model::from)
            .collect())
    }

    pub(crate) async fn stream_completion(
        &self,
        model: &str,
        messages: &[Message],
    ) -> Result<Box<dyn AsyncMessageIterator>, Error> {
        let messages = to_api_messages(messages);

        let iterator = self.api.streaming_chat_completion(model, &messages).await?;

        Ok(Box::new(OpenAICompletionResponse::new(iterator)))
    }

    /// Requests a single, non-streamed completion. `response_format` is passed
    /// through verbatim, e.g. a `json_schema` for structured output.
    pub(crate) async fn completion(
        &self,
        model: &str,
        messages: &[Message],
        response_format: Option<&serde_json::Value>,
    ) -> Result<Completion, Error> {
        let messages = to_api_messages(messages);

        let completion = self
            .api
            .chat_completion(model, &messages, response_format)
            .await?;

        Ok(Completion {
            content: completion
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content),
            usage: completion.usage.map(Usage::from).unwrap_or_default(),
        })
    }
}

/// Lists the deployments of a hosted OpenAI-compatible service.
pub(crate) struct HostedProvider {
    /// Unset when either the endpoint or the key is missing, in which case
    /// nothing can be listed.
    client: Option<OpenAIClient>,
}

impl HostedProvider {
    pub(crate) fn new(
        api_key: &str,
        endpoint: Option<Url>,
        timeout: Duration,
    ) -> Result<HostedProvider, Error> {
        let client = match endpoint {
            Some(endpoint) if !api_key.is_empty() => {
                Some(OpenAIClient::new(api_key, endpoint, timeout)?)
            }
            _ => None,
        };

        Ok(HostedProvider { client })
    }
}

#[async_trait]
impl ModelLister for HostedProvider {
    fn id(&self) -> ProviderIdentifier {
        ProviderIdentifier::Hosted
    }

    fn naming(&self) -> NamingScheme {
        NamingScheme::Flat
    }

    fn base_url(&self) -> Option<&Url> {
        self.client.as_ref().map(|c| c.api_base())
    }

    async fn models(&self) -> Result<Vec<Model>, Error> {
        match &self.client {
            Some(client) => client.models().await,
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn base_for(server: &MockServer) -> Url {
        Url::parse(&format!("{}/openai/v1", server.uri())).unwrap()
    }

    #[tokio::test]
    async fn hosted_without_key_never_calls_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let provider =
            HostedProvider::new("", Some(base_for(&server)), Duration::from_secs(2)).unwrap();

        assert!(provider.models().await.unwrap().is_empty());
        assert!(provider.base_url().is_none());

        let provider = HostedProvider::new("key", None, Duration::from_secs(2)).unwrap();

        assert!(provider.models().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn hosted_lists_deployments() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/openai/v1/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"id": "gpt-4o"}, {"id": ""}]
            })))
            .mount(&server)
            .await;

        let provider =
            HostedProvider::new("key", Some(base_for(&server)), Duration::from_secs(2)).unwrap();

        assert_eq!(provider.models().await.unwrap(), vec![Model::new("gpt-4o")]);
    }

    #[tokio::test]
    async fn stream_skips_empty_chunks_and_records_usage() {
        let body = concat!(
            "data: {\"choices\":[],\"prompt_filter_results\":[]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\",\"content\":\"\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
            "data: {\"choices\":[],\"usage\":{\"prompt_tokens\":4,\"completion_tokens\":2,\"total_tokens\":6}}\n\n",
            "data: [DONE]\n\n",
        );

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let client = OpenAIClient::new("key", base_for(&server), Duration::from_secs(5)).unwrap();
        let messages = chat::single_turn(None, "hi".to_string());
        let mut stream = client.stream_completion("gpt-4o", &messages).await.unwrap();

        let mut deltas = Vec::new();
        while let Some(delta) = stream.next().await {
            deltas.push(delta.unwrap().content);
        }

        assert_eq!(deltas, ["Hel", "lo"]);
        assert_eq!(
            stream.usage(),
            Usage {
                prompt_tokens: 4,
                completion_tokens: 2,
                total_tokens: 6
            }
        );
    }

    #[tokio::test]
    async fn completion_takes_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/v1/chat/completions"))
            .and(body_partial_json(serde_json::json!({
                "messages": [
                    {"role": "system", "content": "judge"},
                    {"role": "user", "content": "compare"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "first"}}, {"message": {"content": "second"}}]
            })))
            .mount(&server)
            .await;

        let client = OpenAIClient::new("key", base_for(&server), Duration::from_secs(5)).unwrap();
        let messages = chat::single_turn(Some("judge"), "compare".to_string());
        let completion = client.completion("gpt-4o", &messages, None).await.unwrap();

        assert_eq!(completion.content.as_deref(), Some("first"));
        assert_eq!(completion.usage, Usage::default());
    }

    #[tokio::test]
    async fn api_errors_keep_their_category() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {"message": "slow down"}
            })))
            .mount(&server)
            .await;

        let client = OpenAIClient::new("key", base_for(&server), Duration::from_secs(5)).unwrap();
        let messages = chat::single_turn(None, "hi".to_string());
        let err = client.completion("gpt-4o", &messages, None).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ExcessUsage);
        assert!(err.to_string().contains("slow down"));
    }
}
