use futures_util::future::join_all;
use serde::Serialize;
use std::sync::Arc;

use super::default_priority::default_priority;
use super::matcher::find_model;
use super::{AvailableModelSet, ModelListCache};
use crate::providers::providers::ProviderIdentifier;

/// Where a single chat request should be sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct ResolvedRoute {
    /// The backend which claimed the model. `None` when no model was requested, in
    /// which case the caller's parameters are passed through untouched.
    pub provider: Option<ProviderIdentifier>,
    /// The model name to send, possibly expanded with a tag.
    pub model: String,
    pub base_url: String,
    pub credential: String,
}

/// A local backend together with the fixed parameters used to reach its
/// chat completion API.
pub(crate) struct LocalBackend {
    cache: ModelListCache,
    base_url: String,
    credential: String,
}

impl LocalBackend {
    pub(crate) fn new(
        cache: ModelListCache,
        base_url: impl Into<String>,
        credential: impl Into<String>,
    ) -> LocalBackend {
        LocalBackend {
            cache,
            base_url: base_url.into(),
            credential: credential.into(),
        }
    }

    fn priority(&self) -> u8 {
        default_priority(self.cache.provider())
    }
}

/// Routes requests to Ollama, then LM Studio, then the caller's own parameters.
pub(crate) struct ProviderResolver {
    local: Vec<LocalBackend>,
    hosted: ModelListCache,
}

impl ProviderResolver {
    pub(crate) fn new(
        ollama: LocalBackend,
        lmstudio: LocalBackend,
        hosted: ModelListCache,
    ) -> ProviderResolver {
        let mut local = vec![ollama, lmstudio];

        local.sort_by_key(|b| std::cmp::Reverse(b.priority()));

        ProviderResolver { local, hosted }
    }

    /// Picks the backend for `requested`. The first local backend which serves the
    /// model wins. Otherwise the fallback parameters are returned as they are, and
    /// it is up to the caller to check that they are usable.
    pub(crate) async fn resolve(
        &self,
        requested: &str,
        fallback_base_url: &str,
        fallback_credential: &str,
    ) -> ResolvedRoute {
        if requested.is_empty() {
            return ResolvedRoute {
                provider: None,
                model: String::new(),
                base_url: fallback_base_url.to_string(),
                credential: fallback_credential.to_string(),
            };
        }

        for backend in &self.local {
            let available = backend.cache.get_or_refresh().await;

            if let Some(model) = find_model(requested, &available, backend.cache.naming()) {
                tracing::info!(
                    requested,
                    model = %model,
                    provider = %backend.cache.provider(),
                    base_url = %backend.base_url,
                    "routing to local provider"
                );

                return ResolvedRoute {
                    provider: Some(backend.cache.provider()),
                    model,
                    base_url: backend.base_url.clone(),
                    credential: backend.credential.clone(),
                };
            }
        }

        tracing::debug!(requested, "no local provider serves the model, using fallback");

        ResolvedRoute {
            provider: Some(ProviderIdentifier::Hosted),
            model: requested.to_string(),
            base_url: fallback_base_url.to_string(),
            credential: fallback_credential.to_string(),
        }
    }

    /// Every backend's cache, from the highest priority to the lowest.
    pub(crate) fn caches(&self) -> impl Iterator<Item = &ModelListCache> {
        self.local
            .iter()
            .map(|b| &b.cache)
            .chain(std::iter::once(&self.hosted))
    }

    /// The current model set of every backend, refreshing stale ones concurrently.
    pub(crate) async fn available_models(
        &self,
    ) -> Vec<(ProviderIdentifier, Arc<AvailableModelSet>)> {
        let caches: Vec<&ModelListCache> = self.caches().collect();

        let sets = join_all(caches.iter().map(|c| c.get_or_refresh())).await;

        caches.iter().map(|c| c.provider()).zip(sets).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ErrorKind;
    use crate::registry::testing::{call_count, FakeLister, Listing, ManualClock};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    const OLLAMA_V1: &str = "http://localhost:11434/v1";
    const LM_STUDIO_V1: &str = "http://localhost:1234/v1";

    struct Fixture {
        resolver: ProviderResolver,
        ollama_calls: Arc<AtomicUsize>,
        lmstudio_calls: Arc<AtomicUsize>,
        hosted_calls: Arc<AtomicUsize>,
    }

    fn fixture(ollama: Listing, lmstudio: Listing) -> Fixture {
        let clock = ManualClock::new();
        let ttl = Duration::from_secs(30);

        let ollama = FakeLister::ollama(ollama);
        let lmstudio = FakeLister::lmstudio(lmstudio);
        let hosted = FakeLister::hosted(Listing::Models(vec!["gpt-4o"]));

        let ollama_calls = ollama.calls();
        let lmstudio_calls = lmstudio.calls();
        let hosted_calls = hosted.calls();

        // Passed in the wrong order on purpose, the resolver sorts by priority
        let resolver = ProviderResolver::new(
            LocalBackend::new(
                ModelListCache::new(Box::new(lmstudio), ttl, clock.clone()),
                LM_STUDIO_V1,
                "lm-studio",
            ),
            LocalBackend::new(
                ModelListCache::new(Box::new(ollama), ttl, clock.clone()),
                OLLAMA_V1,
                "ollama",
            ),
            ModelListCache::new(Box::new(hosted), ttl, clock),
        );

        Fixture {
            resolver,
            ollama_calls,
            lmstudio_calls,
            hosted_calls,
        }
    }

    #[tokio::test]
    async fn base_name_resolves_to_tagged_ollama_model() {
        let f = fixture(
            Listing::Models(vec!["llama3.2:latest"]),
            Listing::Models(vec![]),
        );

        let route = f
            .resolver
            .resolve("llama3.2", "https://api.example.com", "sk-abc")
            .await;

        assert_eq!(
            route,
            ResolvedRoute {
                provider: Some(ProviderIdentifier::Ollama),
                model: "llama3.2:latest".to_string(),
                base_url: OLLAMA_V1.to_string(),
                credential: "ollama".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn ollama_wins_over_lmstudio() {
        let f = fixture(
            Listing::Models(vec!["qwen2.5:7b"]),
            Listing::Models(vec!["qwen2.5:7b"]),
        );

        let route = f.resolver.resolve("qwen2.5:7b", "", "").await;

        assert_eq!(route.provider, Some(ProviderIdentifier::Ollama));
        assert_eq!(route.model, "qwen2.5:7b");
        assert_eq!(call_count(&f.lmstudio_calls), 0);
    }

    #[tokio::test]
    async fn unreachable_ollama_falls_through_to_lmstudio() {
        let f = fixture(
            Listing::Fails(ErrorKind::Connection),
            Listing::Models(vec!["gpt-oss-20b"]),
        );

        let route = f
            .resolver
            .resolve("gpt-oss-20b", "https://api.example.com", "sk-abc")
            .await;

        assert_eq!(
            route,
            ResolvedRoute {
                provider: Some(ProviderIdentifier::LmStudio),
                model: "gpt-oss-20b".to_string(),
                base_url: LM_STUDIO_V1.to_string(),
                credential: "lm-studio".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn lmstudio_does_not_expand_tags() {
        let f = fixture(
            Listing::Models(vec![]),
            Listing::Models(vec!["mistral:7b"]),
        );

        let route = f.resolver.resolve("mistral", "https://api.example.com", "k").await;

        assert_eq!(route.provider, Some(ProviderIdentifier::Hosted));
        assert_eq!(route.model, "mistral");
    }

    #[tokio::test]
    async fn unknown_model_uses_fallback_unchanged() {
        let f = fixture(
            Listing::Models(vec!["llama3.2:latest"]),
            Listing::Models(vec!["gpt-oss-20b"]),
        );

        let route = f
            .resolver
            .resolve("claude-x", "https://api.example.com", "sk-abc")
            .await;

        assert_eq!(
            route,
            ResolvedRoute {
                provider: Some(ProviderIdentifier::Hosted),
                model: "claude-x".to_string(),
                base_url: "https://api.example.com".to_string(),
                credential: "sk-abc".to_string(),
            }
        );

        // The hosted listing plays no part in resolution
        assert_eq!(call_count(&f.hosted_calls), 0);
    }

    #[tokio::test]
    async fn empty_request_probes_nothing() {
        let f = fixture(
            Listing::Models(vec!["llama3.2:latest"]),
            Listing::Models(vec!["gpt-oss-20b"]),
        );

        let route = f.resolver.resolve("", "https://api.example.com", "sk-abc").await;

        assert_eq!(route.provider, None);
        assert_eq!(route.model, "");
        assert_eq!(route.base_url, "https://api.example.com");
        assert_eq!(route.credential, "sk-abc");
        assert_eq!(call_count(&f.ollama_calls), 0);
        assert_eq!(call_count(&f.lmstudio_calls), 0);
    }

    #[tokio::test]
    async fn repeated_resolution_reuses_cached_lists() {
        let f = fixture(Listing::Models(vec![]), Listing::Models(vec![]));

        for _ in 0..3 {
            f.resolver.resolve("claude-x", "", "").await;
        }

        assert_eq!(call_count(&f.ollama_calls), 1);
        assert_eq!(call_count(&f.lmstudio_calls), 1);
    }

    #[tokio::test]
    async fn lists_every_provider_in_priority_order() {
        let f = fixture(
            Listing::Models(vec!["llama3.2:latest"]),
            Listing::Fails(ErrorKind::TimedOut),
        );

        let available = f.resolver.available_models().await;
        let providers: Vec<ProviderIdentifier> = available.iter().map(|(p, _)| *p).collect();

        assert_eq!(
            providers,
            [
                ProviderIdentifier::Ollama,
                ProviderIdentifier::LmStudio,
                ProviderIdentifier::Hosted
            ]
        );
        assert_eq!(available[0].1.len(), 2);
        assert!(available[1].1.is_empty());
        assert!(available[2].1.contains("gpt-4o"));
        assert_eq!(call_count(&f.hosted_calls), 1);
    }
}
