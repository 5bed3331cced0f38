//! A client for OpenAI-compatible APIs, used both to list hosted deployments and
//! to forward chat completions.

mod api;
mod provider;

pub(crate) use self::provider::{HostedProvider, OpenAIClient};
