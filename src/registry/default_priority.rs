use crate::providers::providers::ProviderIdentifier;

/// Local backends are consulted from the highest priority to the lowest. The hosted
/// backend has the lowest priority since it is only ever the fallback.
pub(crate) fn default_priority(provider_id: ProviderIdentifier) -> u8 {
    match provider_id {
        ProviderIdentifier::Ollama => 30,
        ProviderIdentifier::LmStudio => 20,
        ProviderIdentifier::Hosted => 10,
    }
}
