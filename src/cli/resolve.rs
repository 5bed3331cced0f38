use serde::Serialize;
use std::sync::Arc;

use super::table::{format_output, Table};
use crate::config::Config;
use crate::providers::providers::ProviderIdentifier;
use crate::registry::{populate::populated_resolver, ResolvedRoute, SystemClock};
use crate::{die, ResolveArgs};

/// Shown in place of a credential the user supplied.
const REDACTED: &str = "********";

/// A [`ResolvedRoute`] as printed. Local backends use fixed placeholder
/// credentials, which are shown. Anything else is redacted.
#[derive(Debug, Serialize, PartialEq, Eq)]
struct Route {
    provider: Option<ProviderIdentifier>,
    model: String,
    base_url: String,
    credential: String,
}

impl From<ResolvedRoute> for Route {
    fn from(route: ResolvedRoute) -> Self {
        let local = matches!(
            route.provider,
            Some(ProviderIdentifier::Ollama | ProviderIdentifier::LmStudio)
        );

        let credential = if local || route.credential.is_empty() {
            route.credential
        } else {
            REDACTED.to_string()
        };

        Route {
            provider: route.provider,
            model: route.model,
            base_url: route.base_url,
            credential,
        }
    }
}

fn or_dash(value: String) -> String {
    if value.is_empty() {
        "-".to_string()
    } else {
        value
    }
}

impl From<Route> for Table {
    fn from(route: Route) -> Self {
        let mut tab = Table::new(vec!["PROVIDER", "MODEL", "BASE_URL", "CREDENTIAL"]);

        tab.add_row(vec![
            route.provider.map_or("-".to_string(), |p| p.to_string()),
            or_dash(route.model),
            or_dash(route.base_url),
            or_dash(route.credential),
        ]);

        tab
    }
}

/// Arguments win over the configured hosted defaults.
fn fallback<'a>(arg: Option<&'a str>, configured: &'a str) -> &'a str {
    match arg {
        Some(value) if !value.is_empty() => value,
        _ => configured,
    }
}

pub(crate) async fn resolve_cmd(config: &Config, args: &ResolveArgs) {
    let resolver = match populated_resolver(config, Arc::new(SystemClock)) {
        Ok(resolver) => resolver,
        Err(err) => die!("failed to resolve \"{}\": {}", args.model, err),
    };

    let hosted = &config.providers.hosted;

    let route = resolver
        .resolve(
            &args.model,
            fallback(args.base_url.as_deref(), &hosted.endpoint),
            fallback(args.api_key.as_deref(), &hosted.api_key),
        )
        .await;

    format_output(Route::from(route), args.format);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(provider: Option<ProviderIdentifier>, credential: &str) -> ResolvedRoute {
        ResolvedRoute {
            provider,
            model: "llama3.2:latest".to_string(),
            base_url: "http://localhost:11434/v1".to_string(),
            credential: credential.to_string(),
        }
    }

    #[test]
    fn local_placeholders_are_shown() {
        let printed = Route::from(route(Some(ProviderIdentifier::Ollama), "ollama"));

        assert_eq!(printed.credential, "ollama");
    }

    #[test]
    fn hosted_keys_are_redacted() {
        let printed = Route::from(route(Some(ProviderIdentifier::Hosted), "sk-secret"));
        assert_eq!(printed.credential, REDACTED);

        let printed = Route::from(route(None, "sk-secret"));
        assert_eq!(printed.credential, REDACTED);

        let printed = Route::from(route(Some(ProviderIdentifier::Hosted), ""));
        assert_eq!(printed.credential, "");
    }

    #[test]
    fn arguments_override_configuration() {
        assert_eq!(fallback(Some("http://a"), "http://b"), "http://a");
        assert_eq!(fallback(Some(""), "http://b"), "http://b");
        assert_eq!(fallback(None, "http://b"), "http://b");
    }

    #[test]
    fn empty_fields_are_dashed() {
        let table: Table = Route::from(ResolvedRoute {
            provider: None,
            model: String::new(),
            base_url: String::new(),
            credential: String::new(),
        })
        .into();

        assert_eq!(
            table.to_string(),
            "PROVIDER  MODEL  BASE_URL  CREDENTIAL\n\
             -         -      -         -\n"
        );
    }
}
