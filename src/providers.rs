//! Clients for the model backends the relay knows about.
//!
//! Each backend (Ollama, LM Studio or a hosted OpenAI-compatible API) speaks a slightly
//! different protocol for enumerating its models. The [`ModelLister`] trait hides those
//! differences behind a single `models` operation so that higher layers can probe every
//! backend the same way. The hosted backend additionally exposes the chat completion
//! API which the relay forwards inference requests to, see [`openai`].
//!
//! ## Error Handling
//!
//! Each API has its own error surface. Ollama barely documents its errors, while the
//! OpenAI API is explicit about status codes. Every client therefore has a private error
//! type, and all of them are folded into [`Error`], whose [`ErrorKind`] gives the
//! category of the failure.

mod apireq;
mod lmstudio;
mod ollama;
pub(crate) mod openai;

pub(crate) mod providers;

use async_trait::async_trait;
use std::error::Error as StdError;
use std::fmt;

pub(crate) use self::apireq::Url;
use self::providers::ProviderIdentifier;

/// General categories of errors that can be returned by a provider client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorKind {
    /// Failed to connect to the underlying API service. This could be due to
    /// DNS resolution, connectivity issues, or the service simply not running.
    Connection,
    /// A request timed out.
    TimedOut,
    /// An API key was not provided or was rejected.
    Authentication,
    /// A rate limit was reached or a quota was exceeded.
    ExcessUsage,
    /// The servers are overloaded, a retry may succeed later.
    ApiOverloaded,
    /// The requested resource was not found, usually an unknown model.
    NotFound,
    /// The request was malformed (HTTP status codes in the 400s).
    BadRequest,
    /// The server encountered an error (HTTP status codes in the 500s).
    InternalError,
    /// An API response could not be deserialized or violated the assumptions
    /// of the client.
    UnexpectedResponse,
    /// An error that does not fit into any of the other categories.
    UnspecifiedError,
}

#[derive(Debug)]
pub(crate) struct Error {
    kind: ErrorKind,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    #[cfg(test)]
    pub(crate) fn from_kind(kind: ErrorKind) -> Error {
        Error { kind, source: None }
    }

    pub(crate) fn from_source(kind: ErrorKind, source: Box<dyn StdError + Send + Sync>) -> Error {
        Error {
            kind,
            source: Some(source),
        }
    }

    pub(crate) fn kind(&self) -> ErrorKind {
        self.kind
    }

    fn message(&self) -> &'static str {
        match self.kind {
            ErrorKind::Connection => "failed to connect to the API service",
            ErrorKind::TimedOut => "request timed out",
            ErrorKind::Authentication => "authentication failed or not provided",
            ErrorKind::ExcessUsage => "rate limit exceeded or quota crossed",
            ErrorKind::ApiOverloaded => "API server(s) are currently overloaded",
            ErrorKind::NotFound => "the requested resource was not found",
            ErrorKind::BadRequest => "the request was bad or malformed",
            ErrorKind::InternalError => "the server encountered an internal error",
            ErrorKind::UnexpectedResponse => "API response was unexpected or malformed",
            ErrorKind::UnspecifiedError => "an unspecified error occurred",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}: {}", self.message(), source),
            None => write!(f, "{}", self.message()),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_ref().map(|e| &**e as _)
    }
}

/// A message delta represents a "chunk" of a streamed message.
/// Usually, this consists of a handful of tokens.
#[derive(Debug, Clone)]
pub(crate) struct MessageDelta {
    pub content: String,
}

/// Token usage reported by the provider for a single completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// A streamed response from a completion.
#[async_trait]
pub(crate) trait AsyncMessageIterator: Send {
    /// The next chunk of the message.
    async fn next(&mut self) -> Option<Result<MessageDelta, Error>>;

    /// The usage for this request. Providers only report it at the end of the
    /// stream, so this is zeroed until the iterator is exhausted.
    fn usage(&self) -> Usage;
}

/// A non-streamed response from a completion.
#[derive(Debug, Clone)]
pub(crate) struct Completion {
    /// The text of the first choice, if the model produced any.
    pub content: Option<String>,
    pub usage: Usage,
}

/// How a provider names its models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NamingScheme {
    /// Names carry a `name:tag` version suffix, and the untagged form is an alias
    /// of the tagged one (Ollama).
    Tagged,
    /// Names are opaque and only match exactly.
    Flat,
}

/// The delimiter between a model's base name and its tag.
pub(crate) const TAG_DELIMITER: char = ':';

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Model {
    /// The ID of the model, as accepted by the provider's completion API.
    pub id: String,
}

impl Model {
    pub(crate) fn new(id: impl Into<String>) -> Model {
        Model { id: id.into() }
    }
}

/// A trait implemented by every backend that can enumerate its models.
#[async_trait]
pub(crate) trait ModelLister: Send + Sync {
    /// Returns the provider identifier.
    fn id(&self) -> ProviderIdentifier;

    /// Returns the naming convention used by [`ModelLister::models`].
    fn naming(&self) -> NamingScheme;

    /// Returns the base URL the listing request is issued against, if the
    /// provider is configured with one.
    fn base_url(&self) -> Option<&Url>;

    /// Returns the models the provider currently reports as available. A single
    /// request is issued, and no retries are attempted.
    async fn models(&self) -> Result<Vec<Model>, Error>;
}

pub(crate) use self::lmstudio::{LmStudioProvider, LM_STUDIO_API_KEY};
pub(crate) use self::ollama::OllamaProvider;
pub(crate) use self::openai::{HostedProvider, OpenAIClient};
