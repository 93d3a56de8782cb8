//! Tag diff computation and application.

use crate::error::{TagError, TagResult};
use crate::tag_set::{TagFilter, TagSet};
use crate::writer::TagWriter;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::debug;

/// The minimal work needed to turn one tag set into another.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TagDiff {
    /// Tags to add.
    pub to_create: TagSet,
    /// Tags whose value changes.
    pub to_update: TagSet,
    /// Keys to remove.
    pub to_delete: BTreeSet<String>,
}

impl TagDiff {
    /// Computes the work to move remote tags from `existing` to `desired`.
    ///
    /// Keys under the platform prefix are always dropped from both sides, as
    /// are keys matching any of `filters`.
    pub fn compute(existing: &TagSet, desired: &TagSet, filters: &[TagFilter]) -> Self {
        let existing = existing.ignore_platform().ignore(filters);
        let desired = desired.ignore_platform().ignore(filters);

        let mut diff = TagDiff::default();
        for (key, value) in desired.iter() {
            match existing.get(key) {
                None => {
                    diff.to_create.insert(key.clone(), value.clone());
                }
                Some(current) if current != value.as_str() => {
                    diff.to_update.insert(key.clone(), value.clone());
                }
                Some(_) => {}
            }
        }
        diff.to_delete = existing
            .keys()
            .filter(|key| !desired.contains_key(key))
            .map(str::to_string)
            .collect();
        diff
    }

    /// Returns true if there is nothing to do.
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty()
    }

    /// Tags to write in one batched call: creates and updates together.
    pub fn upserts(&self) -> TagSet {
        self.to_create.merge(&self.to_update)
    }

    /// Applies the diff to `resource` through `writer`.
    ///
    /// Removals are sent first as one call, then creates and updates as one
    /// batched call. Empty calls are skipped. The first failure is returned
    /// and the remaining call is not attempted.
    pub fn apply<W: TagWriter + ?Sized>(&self, writer: &W, resource: &str) -> TagResult<()> {
        let removed: Vec<String> = self.to_delete.iter().cloned().collect();
        if !removed.is_empty() {
            debug!(resource, keys = ?removed, "removing tags");
            writer
                .remove_tags(resource, &removed)
                .map_err(|source| TagError::Remove {
                    resource: resource.to_string(),
                    keys: removed.clone(),
                    source,
                })?;
        }

        let upserts = self.upserts();
        if !upserts.is_empty() {
            debug!(
                resource,
                created = self.to_create.len(),
                updated = self.to_update.len(),
                "tagging resource"
            );
            writer
                .upsert_tags(resource, &upserts)
                .map_err(|source| TagError::Upsert {
                    resource: resource.to_string(),
                    keys: upserts.keys().map(str::to_string).collect(),
                    removed,
                    source,
                })?;
        }

        Ok(())
    }
}

/// Reconciles a resource's tags from `old` to `new`.
///
/// This is the update path of a resource: `old` and `new` are the prior and
/// planned `tags_all`. Returns the diff that was applied.
pub fn update_tags<W: TagWriter + ?Sized>(
    writer: &W,
    resource: &str,
    old: &TagSet,
    new: &TagSet,
    filters: &[TagFilter],
) -> TagResult<TagDiff> {
    let diff = TagDiff::compute(old, new, filters);
    if diff.is_empty() {
        debug!(resource, "tags already up to date");
        return Ok(diff);
    }
    diff.apply(writer, resource)?;
    Ok(diff)
}
