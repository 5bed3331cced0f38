use super::{Error, RelayState};
use crate::providers::{OpenAIClient, Url};
use crate::registry::ResolvedRoute;

/// The request's value when it has one, otherwise the configured default.
fn effective(requested: Option<&str>, default: &str) -> String {
    match requested {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => default.to_string(),
    }
}

/// Resolves the backend for a request and checks that the chosen route can be
/// used. Returns the route together with a client for it.
pub(super) async fn route_request(
    state: &RelayState,
    model: Option<&str>,
    base_url: Option<&str>,
    api_key: Option<&str>,
) -> Result<(ResolvedRoute, OpenAIClient), Error> {
    let defaults = &state.defaults;

    let model = effective(model, &defaults.model);
    let base_url = effective(base_url, &defaults.endpoint);
    let api_key = effective(api_key, &defaults.api_key);

    let route = state.resolver.resolve(&model, &base_url, &api_key).await;

    let mut missing = Vec::new();

    if route.base_url.is_empty() {
        missing.push("Base URL (AZURE_ENDPOINT)");
    }
    if route.credential.is_empty() {
        missing.push("API Key (AZURE_KEY)");
    }
    if route.model.is_empty() {
        missing.push("Model (AZURE_MODEL)");
    }

    if !missing.is_empty() {
        return Err(Error::MissingConfiguration(missing));
    }

    let api_base = Url::parse(&route.base_url)
        .map_err(|e| Error::InvalidBaseUrl(route.base_url.clone(), e))?;

    let client = OpenAIClient::new(&route.credential, api_base, state.inference_timeout)
        .map_err(Error::Client)?;

    Ok((route, client))
}
