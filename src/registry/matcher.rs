use crate::providers::{NamingScheme, TAG_DELIMITER};

use super::AvailableModelSet;

/// The tag Ollama assigns when a model is pulled without one.
const DEFAULT_TAG: &str = "latest";

/// Maps a requested model onto the names a backend knows. Returns the name to send
/// to the backend, which for tagged naming may differ from `requested`.
pub(super) fn find_model(
    requested: &str,
    available: &AvailableModelSet,
    naming: NamingScheme,
) -> Option<String> {
    match naming {
        NamingScheme::Tagged => find_tagged(requested, available),
        NamingScheme::Flat => available.get(requested).cloned(),
    }
}

/// First match wins: the exact name, then `requested:latest`, then any
/// `requested:<tag>`. Among several tags the choice is unspecified.
///
/// Only reported names are candidates. An untagged alias always has its tagged
/// name in the set, which the later tiers find.
fn find_tagged(requested: &str, available: &AvailableModelSet) -> Option<String> {
    if let Some(name) = available.get(requested) {
        return Some(name.clone());
    }

    let latest = format!("{requested}{TAG_DELIMITER}{DEFAULT_TAG}");
    if let Some(name) = available.get(&latest) {
        return Some(name.clone());
    }

    let prefix = format!("{requested}{TAG_DELIMITER}");
    available.names().find(|m| m.starts_with(&prefix)).cloned()
}
