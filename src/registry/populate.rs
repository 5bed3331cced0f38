use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::{Clock, LocalBackend, ModelListCache, ProviderResolver};
use crate::config::Config;
use crate::providers::providers::ProviderIdentifier;
use crate::providers::{
    self, HostedProvider, LmStudioProvider, OllamaProvider, Url, LM_STUDIO_API_KEY,
};

/// The credential Ollama's OpenAI-compatible API expects. Any value is accepted.
const OLLAMA_API_KEY: &str = "ollama";

#[derive(Error, Debug)]
pub(crate) enum Error {
    #[error("invalid {provider} URL \"{url}\": {source}")]
    InvalidUrl {
        provider: ProviderIdentifier,
        url: String,
        source: url::ParseError,
    },
    #[error("failed to set up the {0} client: {1}")]
    Client(ProviderIdentifier, #[source] providers::Error),
}

fn parse_url(provider: ProviderIdentifier, url: &str) -> Result<Url, Error> {
    Url::parse(url).map_err(|source| Error::InvalidUrl {
        provider,
        url: url.to_string(),
        source,
    })
}

/// Ollama serves its OpenAI-compatible API under `/v1` of the daemon root.
fn ollama_v1(host: &str) -> String {
    format!("{}/v1", host.trim_end_matches('/'))
}

/// Builds the resolver and the per-provider caches from the configuration.
pub(crate) fn populated_resolver(
    config: &Config,
    clock: Arc<dyn Clock>,
) -> Result<ProviderResolver, Error> {
    let timeout = config.probe_timeout();
    let providers = &config.providers;

    let ollama = {
        let id = ProviderIdentifier::Ollama;
        let host = parse_url(id, &providers.ollama.host)?;
        let lister = OllamaProvider::new(host, timeout).map_err(|e| Error::Client(id, e))?;

        LocalBackend::new(
            ModelListCache::new(
                Box::new(lister),
                Duration::from_secs(providers.ollama.cache_ttl_secs),
                clock.clone(),
            ),
            ollama_v1(&providers.ollama.host),
            OLLAMA_API_KEY,
        )
    };

    let lmstudio = {
        let id = ProviderIdentifier::LmStudio;
        let base = parse_url(id, &providers.lmstudio.base_url)?;
        let lister = LmStudioProvider::new(base, timeout).map_err(|e| Error::Client(id, e))?;

        LocalBackend::new(
            ModelListCache::new(
                Box::new(lister),
                Duration::from_secs(providers.lmstudio.cache_ttl_secs),
                clock.clone(),
            ),
            providers.lmstudio.base_url.clone(),
            LM_STUDIO_API_KEY,
        )
    };

    let hosted = {
        let id = ProviderIdentifier::Hosted;
        let hosted = &providers.hosted;

        let endpoint = if hosted.endpoint.is_empty() {
            None
        } else {
            Some(parse_url(id, &hosted.endpoint)?)
        };

        let lister = HostedProvider::new(&hosted.api_key, endpoint, timeout)
            .map_err(|e| Error::Client(id, e))?;

        ModelListCache::new(
            Box::new(lister),
            Duration::from_secs(hosted.cache_ttl_secs),
            clock,
        )
    };

    let resolver = ProviderResolver::new(ollama, lmstudio, hosted);

    for cache in resolver.caches() {
        tracing::debug!(
            provider = %cache.provider(),
            url = cache.base_url().map_or("", |u| u.as_str()),
            ttl_secs = cache.ttl().as_secs(),
            "provider configured"
        );
    }

    Ok(resolver)
}
