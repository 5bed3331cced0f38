use serde::Serialize;
use std::sync::Arc;

use super::table::{format_output, Table};
use crate::config::Config;
use crate::providers::providers::ProviderIdentifier;
use crate::registry::{populate::populated_resolver, ProviderResolver, SystemClock};
use crate::{die, ListArgs};

#[derive(Debug, Serialize, PartialEq, Eq)]
struct ProvidedModel {
    model: String,
    provider: ProviderIdentifier,
}

impl From<Vec<ProvidedModel>> for Table {
    fn from(value: Vec<ProvidedModel>) -> Self {
        let mut tab = Table::new(vec!["MODEL", "PROVIDER"]);

        for model in value {
            tab.add_row(vec![model.model, model.provider.to_string()]);
        }

        tab
    }
}

/// Probes the backends, or only `provider`, and collects what they serve in
/// resolution order.
async fn available_models(
    resolver: &ProviderResolver,
    provider: Option<ProviderIdentifier>,
) -> Vec<ProvidedModel> {
    let mut listing = Vec::new();

    let caches = resolver
        .caches()
        .filter(|c| provider.map_or(true, |id| c.provider() == id));

    for cache in caches {
        let available = cache.get_or_refresh().await;

        let mut models: Vec<&String> = available.iter().collect();
        models.sort();

        listing.extend(models.into_iter().map(|model| ProvidedModel {
            model: model.clone(),
            provider: cache.provider(),
        }));
    }

    listing
}

pub(crate) async fn list_cmd(config: &Config, args: &ListArgs) {
    let resolver = match populated_resolver(config, Arc::new(SystemClock)) {
        Ok(resolver) => resolver,
        Err(err) => die!("failed to list models: {}", err),
    };

    let models = available_models(&resolver, args.provider).await;

    format_output(models, args.format);
}
