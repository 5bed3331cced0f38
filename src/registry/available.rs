use std::collections::HashSet;

use crate::providers::{Model, NamingScheme, TAG_DELIMITER};

/// The model identifiers a backend currently reports as available.
///
/// Reported names are kept apart from the untagged aliases derived from them.
/// Both answer [`contains`](AvailableModelSet::contains), but only reported names
/// are ever sent back to the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct AvailableModelSet {
    names: HashSet<String>,
    aliases: HashSet<String>,
}

impl AvailableModelSet {
    pub(crate) fn new() -> AvailableModelSet {
        AvailableModelSet::default()
    }

    /// Builds the set from a listing. With tagged naming, `name:tag` also
    /// registers the alias `name`. Blank identifiers are skipped.
    pub(crate) fn from_listing(models: Vec<Model>, naming: NamingScheme) -> AvailableModelSet {
        let mut available = AvailableModelSet {
            names: HashSet::with_capacity(models.len()),
            aliases: HashSet::new(),
        };

        for model in models {
            if model.id.is_empty() {
                continue;
            }

            if naming == NamingScheme::Tagged {
                if let Some((base, _)) = model.id.split_once(TAG_DELIMITER) {
                    if !base.is_empty() {
                        available.aliases.insert(base.to_string());
                    }
                }
            }

            available.names.insert(model.id);
        }

        available
    }

    /// Whether the backend answers to `model`, either as reported or as an alias.
    pub(crate) fn contains(&self, model: &str) -> bool {
        self.names.contains(model) || self.aliases.contains(model)
    }

    /// The names exactly as the backend reported them.
    pub(crate) fn names(&self) -> impl Iterator<Item = &String> {
        self.names.iter()
    }

    pub(crate) fn get(&self, model: &str) -> Option<&String> {
        self.names.get(model)
    }

    /// Every name the backend answers to, aliases included, without duplicates.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &String> {
        let aliases = self.aliases.iter().filter(|a| !self.names.contains(*a));

        self.names.iter().chain(aliases)
    }

    pub(crate) fn len(&self) -> usize {
        self.iter().count()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
