//! Tag writer abstraction.

use crate::error::BoxError;
use crate::tag_set::TagSet;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// A tag writer performs the mutating tag calls against the remote platform.
///
/// Each method represents one network operation and must be idempotent, since
/// callers may re-run a whole reconciliation after a partial failure.
pub trait TagWriter: Send + Sync {
    /// Removes the given keys from the resource.
    fn remove_tags(&self, resource: &str, keys: &[String]) -> Result<(), BoxError>;

    /// Creates or overwrites the given tags on the resource.
    fn upsert_tags(&self, resource: &str, tags: &TagSet) -> Result<(), BoxError>;
}

/// Adapts a pair of closures into a [`TagWriter`].
pub struct FnTagWriter<R, U> {
    remove: R,
    upsert: U,
}

impl<R, U> FnTagWriter<R, U>
where
    R: Fn(&str, &[String]) -> Result<(), BoxError> + Send + Sync,
    U: Fn(&str, &TagSet) -> Result<(), BoxError> + Send + Sync,
{
    /// Creates a writer from a remove and an upsert closure.
    pub fn new(remove: R, upsert: U) -> Self {
        Self { remove, upsert }
    }
}

impl<R, U> TagWriter for FnTagWriter<R, U>
where
    R: Fn(&str, &[String]) -> Result<(), BoxError> + Send + Sync,
    U: Fn(&str, &TagSet) -> Result<(), BoxError> + Send + Sync,
{
    fn remove_tags(&self, resource: &str, keys: &[String]) -> Result<(), BoxError> {
        (self.remove)(resource, keys)
    }

    fn upsert_tags(&self, resource: &str, tags: &TagSet) -> Result<(), BoxError> {
        (self.upsert)(resource, tags)
    }
}

/// An in-memory tag store for testing.
#[derive(Debug, Default)]
pub struct MemoryTagWriter {
    resources: RwLock<BTreeMap<String, TagSet>>,
    calls: RwLock<Vec<String>>,
    fail_remove: RwLock<Option<String>>,
    fail_upsert: RwLock<Option<String>>,
}

impl MemoryTagWriter {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the tags of a resource.
    pub fn set_tags(&self, resource: &str, tags: TagSet) {
        self.resources.write().insert(resource.to_string(), tags);
    }

    /// Gets the current tags of a resource.
    pub fn tags(&self, resource: &str) -> TagSet {
        self.resources
            .read()
            .get(resource)
            .cloned()
            .unwrap_or_default()
    }

    /// Makes every subsequent removal fail with `message`.
    pub fn fail_removals(&self, message: impl Into<String>) {
        *self.fail_remove.write() = Some(message.into());
    }

    /// Makes every subsequent upsert fail with `message`.
    pub fn fail_upserts(&self, message: impl Into<String>) {
        *self.fail_upsert.write() = Some(message.into());
    }

    /// Clears injected failures.
    pub fn clear_failures(&self) {
        *self.fail_remove.write() = None;
        *self.fail_upsert.write() = None;
    }

    /// Names of the calls made so far, in order (`"remove"` or `"upsert"`).
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().clone()
    }
}

impl TagWriter for MemoryTagWriter {
    fn remove_tags(&self, resource: &str, keys: &[String]) -> Result<(), BoxError> {
        self.calls.write().push("remove".into());
        if let Some(message) = self.fail_remove.read().clone() {
            return Err(message.into());
        }
        let mut resources = self.resources.write();
        let tags = resources.entry(resource.to_string()).or_default();
        for key in keys {
            tags.remove(key);
        }
        Ok(())
    }

    fn upsert_tags(&self, resource: &str, tags: &TagSet) -> Result<(), BoxError> {
        self.calls.write().push("upsert".into());
        if let Some(message) = self.fail_upsert.read().clone() {
            return Err(message.into());
        }
        let mut resources = self.resources.write();
        let current = resources.entry(resource.to_string()).or_default();
        *current = current.merge(tags);
        Ok(())
    }
}
