use crate::providers::ModelLister;

use super::AvailableModelSet;

/// Lists the models of a backend. This never fails: an unreachable backend, an
/// error status or a malformed listing all produce an empty set. There are no
/// retries, the next refresh is the retry.
pub(super) async fn probe(lister: &dyn ModelLister) -> AvailableModelSet {
    match lister.models().await {
        Ok(models) => {
            let available = AvailableModelSet::from_listing(models, lister.naming());

            tracing::info!(
                provider = %lister.id(),
                models = available.len(),
                "model list refreshed"
            );

            available
        }
        Err(err) => {
            tracing::debug!(
                provider = %lister.id(),
                url = lister.base_url().map_or("", |u| u.as_str()),
                kind = ?err.kind(),
                error = %err,
                "provider not reachable"
            );

            AvailableModelSet::new()
        }
    }
}
