//! Tag collections and key filters.

use crate::config::IgnoreTagsConfig;
use serde::{Deserialize, Serialize};
use std::collections::{btree_map, BTreeMap, HashMap};

/// Key prefix reserved by the platform. Such tags are never managed by users.
pub const PLATFORM_TAG_PREFIX: &str = "aws:";

/// A rule excluding tag keys from reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TagFilter {
    /// Matches keys starting with the prefix.
    Prefix(String),
    /// Matches exactly one key.
    Key(String),
}

impl TagFilter {
    /// Filter for the platform-reserved prefix.
    pub fn platform() -> Self {
        TagFilter::Prefix(PLATFORM_TAG_PREFIX.to_string())
    }

    /// Returns true if `key` is excluded by this filter.
    pub fn matches(&self, key: &str) -> bool {
        match self {
            TagFilter::Prefix(prefix) => key.starts_with(prefix.as_str()),
            TagFilter::Key(ignored) => key == ignored,
        }
    }
}

/// An order-irrelevant mapping from tag key to tag value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet(BTreeMap<String, String>);

impl TagSet {
    /// Creates an empty tag set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a tag, returning the previous value for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    /// Removes a tag, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    /// Gets the value for a key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Returns true if the key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of tags.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no tags.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over tags in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
        self.0.iter()
    }

    /// Iterates over keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Borrows the underlying map.
    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.0
    }

    /// Returns the tags whose keys match none of `filters`.
    pub fn ignore(&self, filters: &[TagFilter]) -> TagSet {
        self.iter()
            .filter(|(key, _)| !filters.iter().any(|filter| filter.matches(key)))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Drops tags under the platform-reserved prefix.
    pub fn ignore_platform(&self) -> TagSet {
        self.ignore(&[TagFilter::platform()])
    }

    /// Drops tags under any of the given prefixes.
    pub fn ignore_prefixes<I, S>(&self, prefixes: I) -> TagSet
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let filters: Vec<TagFilter> = prefixes
            .into_iter()
            .map(|prefix| TagFilter::Prefix(prefix.into()))
            .collect();
        self.ignore(&filters)
    }

    /// Drops tags matched by the user's ignore configuration.
    pub fn ignore_config(&self, config: &IgnoreTagsConfig) -> TagSet {
        if config.is_empty() {
            return self.clone();
        }
        self.ignore(&config.filters())
    }

    /// Returns `self` overlaid with `other`; `other` wins on shared keys.
    pub fn merge(&self, other: &TagSet) -> TagSet {
        let mut merged = self.clone();
        for (key, value) in other.iter() {
            merged.0.insert(key.clone(), value.clone());
        }
        merged
    }

    /// Tags in `self` whose keys are missing from `new`.
    pub fn removed(&self, new: &TagSet) -> TagSet {
        self.iter()
            .filter(|(key, _)| !new.contains_key(key))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Tags in `new` that are absent from `self` or carry a different value.
    pub fn updated(&self, new: &TagSet) -> TagSet {
        new.iter()
            .filter(|(key, value)| self.get(key) != Some(value.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Returns true if every tag in `other` is present in `self` with the same value.
    pub fn contains_all(&self, other: &TagSet) -> bool {
        other
            .iter()
            .all(|(key, value)| self.get(key) == Some(value.as_str()))
    }

    /// Consumes the set, returning the underlying map.
    pub fn into_map(self) -> BTreeMap<String, String> {
        self.0
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TagSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        TagSet(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl From<BTreeMap<String, String>> for TagSet {
    fn from(map: BTreeMap<String, String>) -> Self {
        TagSet(map)
    }
}

impl From<HashMap<String, String>> for TagSet {
    fn from(map: HashMap<String, String>) -> Self {
        TagSet(map.into_iter().collect())
    }
}

impl IntoIterator for TagSet {
    type Item = (String, String);
    type IntoIter = btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a TagSet {
    type Item = (&'a String, &'a String);
    type IntoIter = btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
