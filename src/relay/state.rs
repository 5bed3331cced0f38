use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::registry::ProviderResolver;

/// Connection parameters used when a request does not bring its own.
#[derive(Debug, Clone, Default)]
pub(crate) struct HostedDefaults {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
}

/// Shared by every handler.
#[derive(Clone)]
pub(crate) struct RelayState {
    pub(super) resolver: Arc<ProviderResolver>,
    pub(super) defaults: Arc<HostedDefaults>,
    pub(super) inference_timeout: Duration,
    pub(super) csv_app_token: Arc<str>,
    pub(super) csv_client: reqwest::Client,
}

impl RelayState {
    pub(crate) fn new(resolver: ProviderResolver, config: &Config) -> Result<RelayState, reqwest::Error> {
        let hosted = &config.providers.hosted;

        if config.csv.app_token.is_empty() {
            tracing::warn!("SOCRATA_APP_TOKEN is not set, CSV fetching is disabled");
        }

        Ok(RelayState {
            resolver: Arc::new(resolver),
            defaults: Arc::new(HostedDefaults {
                endpoint: hosted.endpoint.clone(),
                api_key: hosted.api_key.clone(),
                model: hosted.model.clone(),
            }),
            inference_timeout: config.inference_timeout(),
            csv_app_token: config.csv.app_token.as_str().into(),
            csv_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.csv.timeout_secs))
                .build()?,
        })
    }
}

#[cfg(test)]
impl RelayState {
    /// A state with no hosted defaults and no CSV token.
    pub(crate) fn for_tests(resolver: ProviderResolver) -> RelayState {
        RelayState {
            resolver: Arc::new(resolver),
            defaults: Arc::new(HostedDefaults::default()),
            inference_timeout: Duration::from_secs(5),
            csv_app_token: "".into(),
            csv_client: reqwest::Client::new(),
        }
    }

    pub(crate) fn with_defaults(mut self, endpoint: &str, api_key: &str, model: &str) -> RelayState {
        self.defaults = Arc::new(HostedDefaults {
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        });
        self
    }

    pub(crate) fn with_csv_app_token(mut self, token: &str) -> RelayState {
        self.csv_app_token = token.into();
        self
    }
}
