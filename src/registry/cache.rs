use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::{probe::probe, AvailableModelSet};
use crate::providers::providers::ProviderIdentifier;
use crate::providers::{ModelLister, NamingScheme, Url};

/// A source of monotonic time.
pub(crate) trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

pub(crate) struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

struct CacheEntry {
    models: Arc<AvailableModelSet>,
    fetched_at: Instant,
}

/// Caches the model list of a single backend for `ttl`.
///
/// Concurrent callers which find the entry stale each probe the backend, and the
/// last probe to finish overwrites the entry. The lock is only held to read or
/// replace the entry, never across the probe itself.
pub(crate) struct ModelListCache {
    lister: Box<dyn ModelLister>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entry: Mutex<Option<CacheEntry>>,
}

impl ModelListCache {
    pub(crate) fn new(
        lister: Box<dyn ModelLister>,
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> ModelListCache {
        ModelListCache {
            lister,
            ttl,
            clock,
            entry: Mutex::new(None),
        }
    }

    pub(crate) fn provider(&self) -> ProviderIdentifier {
        self.lister.id()
    }

    pub(crate) fn naming(&self) -> NamingScheme {
        self.lister.naming()
    }

    pub(crate) fn base_url(&self) -> Option<&Url> {
        self.lister.base_url()
    }

    pub(crate) fn ttl(&self) -> Duration {
        self.ttl
    }

    fn fresh(&self, now: Instant) -> Option<Arc<AvailableModelSet>> {
        let entry = self.entry.lock().unwrap_or_else(|e| e.into_inner());

        entry
            .as_ref()
            .filter(|e| now.saturating_duration_since(e.fetched_at) < self.ttl)
            .map(|e| e.models.clone())
    }

    /// Returns the cached model set while it is fresh, otherwise probes the
    /// backend once and replaces the entry with the result, empty or not.
    pub(crate) async fn get_or_refresh(&self) -> Arc<AvailableModelSet> {
        let now = self.clock.now();

        if let Some(models) = self.fresh(now) {
            return models;
        }

        let models = Arc::new(probe(self.lister.as_ref()).await);

        let mut entry = self.entry.lock().unwrap_or_else(|e| e.into_inner());
        *entry = Some(CacheEntry {
            models: models.clone(),
            fetched_at: now,
        });

        models
    }
}
