//! Test doubles for the registry: a clock that only moves when told to and a
//! lister whose answers and call count are controlled by the test.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::{Clock, LocalBackend, ModelListCache, ProviderResolver, SystemClock};
use crate::providers::providers::ProviderIdentifier;
use crate::providers::{Error, ErrorKind, Model, ModelLister, NamingScheme, Url};

pub(crate) struct ManualClock {
    origin: Instant,
    elapsed: Mutex<Duration>,
}

impl ManualClock {
    pub(crate) fn new() -> Arc<ManualClock> {
        Arc::new(ManualClock {
            origin: Instant::now(),
            elapsed: Mutex::new(Duration::ZERO),
        })
    }

    /// Moves the clock to `secs` seconds after its creation.
    pub(crate) fn set_secs(&self, secs: u64) {
        *self.elapsed.lock().unwrap() = Duration::from_secs(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.elapsed.lock().unwrap()
    }
}

/// The answer a [`FakeLister`] gives.
#[derive(Clone)]
pub(crate) enum Listing {
    Models(Vec<&'static str>),
    Fails(ErrorKind),
}

pub(crate) struct FakeLister {
    id: ProviderIdentifier,
    naming: NamingScheme,
    base_url: Url,
    listing: Listing,
    calls: Arc<AtomicUsize>,
}

impl FakeLister {
    pub(crate) fn new(id: ProviderIdentifier, naming: NamingScheme, listing: Listing) -> FakeLister {
        FakeLister {
            id,
            naming,
            base_url: Url::parse("http://fake.invalid/").unwrap(),
            listing,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn ollama(listing: Listing) -> FakeLister {
        FakeLister::new(ProviderIdentifier::Ollama, NamingScheme::Tagged, listing)
    }

    pub(crate) fn lmstudio(listing: Listing) -> FakeLister {
        FakeLister::new(ProviderIdentifier::LmStudio, NamingScheme::Flat, listing)
    }

    pub(crate) fn hosted(listing: Listing) -> FakeLister {
        FakeLister::new(ProviderIdentifier::Hosted, NamingScheme::Flat, listing)
    }

    /// A shared handle on the number of listing requests made so far. It stays
    /// valid after the lister is moved into a cache.
    pub(crate) fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl ModelLister for FakeLister {
    fn id(&self) -> ProviderIdentifier {
        self.id
    }

    fn naming(&self) -> NamingScheme {
        self.naming
    }

    fn base_url(&self) -> Option<&Url> {
        Some(&self.base_url)
    }

    async fn models(&self) -> Result<Vec<Model>, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        match self.listing.clone() {
            Listing::Models(names) => Ok(names.into_iter().map(Model::new).collect()),
            Listing::Fails(kind) => Err(Error::from_kind(kind)),
        }
    }
}

pub(crate) fn call_count(calls: &Arc<AtomicUsize>) -> usize {
    calls.load(Ordering::SeqCst)
}

/// A resolver over fake listers. Each local backend routes to the given URL with
/// its usual placeholder credential, and the hosted backend lists `gpt-4o`.
pub(crate) fn fake_resolver(
    ollama: Listing,
    ollama_url: &str,
    lmstudio: Listing,
    lmstudio_url: &str,
) -> ProviderResolver {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let ttl = Duration::from_secs(30);

    ProviderResolver::new(
        LocalBackend::new(
            ModelListCache::new(Box::new(FakeLister::ollama(ollama)), ttl, clock.clone()),
            ollama_url,
            "ollama",
        ),
        LocalBackend::new(
            ModelListCache::new(Box::new(FakeLister::lmstudio(lmstudio)), ttl, clock.clone()),
            lmstudio_url,
            "lm-studio",
        ),
        ModelListCache::new(
            Box::new(FakeLister::hosted(Listing::Models(vec!["gpt-4o"]))),
            ttl,
            clock,
        ),
    )
}
