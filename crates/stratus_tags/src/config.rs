//! Provider-wide tag configuration.

use crate::tag_set::{TagFilter, TagSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Tag keys the user asked the provider to never manage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnoreTagsConfig {
    /// Exact keys to ignore.
    pub keys: BTreeSet<String>,
    /// Key prefixes to ignore.
    pub key_prefixes: BTreeSet<String>,
}

impl IgnoreTagsConfig {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an exact key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.keys.insert(key.into());
        self
    }

    /// Adds a key prefix.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefixes.insert(prefix.into());
        self
    }

    /// Returns true if nothing is ignored.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty() && self.key_prefixes.is_empty()
    }

    /// Converts the configuration into filters.
    pub fn filters(&self) -> Vec<TagFilter> {
        self.keys
            .iter()
            .cloned()
            .map(TagFilter::Key)
            .chain(self.key_prefixes.iter().cloned().map(TagFilter::Prefix))
            .collect()
    }
}

/// Tags applied to every resource, unless the resource sets the key itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultTagsConfig {
    /// Default tags.
    pub tags: TagSet,
}

impl DefaultTagsConfig {
    /// Creates a configuration from the given defaults.
    pub fn new(tags: TagSet) -> Self {
        Self { tags }
    }

    /// Combines defaults with resource tags; resource tags win.
    pub fn merge_tags(&self, resource_tags: &TagSet) -> TagSet {
        self.tags.merge(resource_tags)
    }

    /// Drops tags that are inherited unchanged from the defaults.
    ///
    /// A resource tag with a default key but a different value is kept,
    /// since it is an override the user wrote.
    pub fn remove_default_tags(&self, tags: &TagSet) -> TagSet {
        if self.tags.is_empty() {
            return tags.clone();
        }
        tags.iter()
            .filter(|(key, value)| self.tags.get(key) != Some(value.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
