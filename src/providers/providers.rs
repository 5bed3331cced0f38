//! Concrete provider identities

use serde::Serialize;
use strum_macros;

/// The `ProviderIdentifier` is a unique per-provider identifier. The set is closed:
/// supporting another backend means adding a listing client, a cache and a slot in
/// the resolution order.
///
/// The `to_string` and `FromStr` forms are part of the CLI and the HTTP API and
/// should remain stable.
#[derive(
    Debug,
    PartialEq,
    Eq,
    Hash,
    Clone,
    Copy,
    Serialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub(crate) enum ProviderIdentifier {
    /// A local Ollama daemon, listed through its native tags endpoint.
    Ollama,
    /// A local LM Studio server, listed through its OpenAI-compatible endpoint.
    LmStudio,
    /// The hosted OpenAI-compatible API (e.g. Azure OpenAI).
    Hosted,
}
