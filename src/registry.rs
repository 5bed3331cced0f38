//! The registry decides which backend serves a chat request.
//!
//! Three backends are known: a local Ollama daemon, a local LM Studio server and a
//! hosted OpenAI-compatible API. Each backend has a [`ModelListCache`] which holds the
//! models it most recently reported. Listing is best-effort: a backend which cannot be
//! reached simply reports no models, and that empty answer is cached like any other so
//! an absent local runner costs one short probe per TTL window rather than one per request.
//!
//! Resolution walks the local backends from the highest to the lowest priority and asks
//! each whether it serves the requested model. The first one to claim it wins. When none
//! of them do, the request is routed with the parameters the caller supplied, which
//! normally point at the hosted API.
//!
//! Ollama names carry a version tag (`llama3.2:latest`), and the untagged name is an alias
//! of the tagged one. The matcher therefore accepts `llama3.2` and answers with the tagged
//! name the daemon actually knows. LM Studio names are opaque and only match exactly.

mod available;
mod cache;
mod default_priority;
mod matcher;
pub(crate) mod populate;
mod probe;
mod resolver;

#[cfg(test)]
pub(crate) mod testing;

pub(crate) use self::available::AvailableModelSet;
pub(crate) use self::cache::{Clock, ModelListCache, SystemClock};
pub(crate) use self::resolver::{LocalBackend, ProviderResolver, ResolvedRoute};
