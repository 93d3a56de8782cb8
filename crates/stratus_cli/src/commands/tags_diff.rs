//! Tags diff command implementation.

use std::path::Path;
use stratus_tags::{TagDiff, TagFilter, TagSet};

/// Keys excluded from the diff on top of the reserved prefix.
#[derive(Debug, Default)]
pub struct Filters {
    /// Ignored key prefixes.
    pub prefixes: Vec<String>,
    /// Ignored exact keys.
    pub keys: Vec<String>,
}

impl Filters {
    fn to_tag_filters(&self) -> Vec<TagFilter> {
        self.prefixes
            .iter()
            .cloned()
            .map(TagFilter::Prefix)
            .chain(self.keys.iter().cloned().map(TagFilter::Key))
            .collect()
    }
}

/// Runs the tags diff command.
pub fn run(old: &Path, new: &Path, filters: &Filters) -> Result<(), Box<dyn std::error::Error>> {
    let existing = load_tags(old)?;
    let desired = load_tags(new)?;

    let diff = diff(&existing, &desired, filters);
    tracing::debug!(
        create = diff.to_create.len(),
        update = diff.to_update.len(),
        delete = diff.to_delete.len(),
        "computed tag diff"
    );
    println!("{}", serde_json::to_string_pretty(&diff)?);
    Ok(())
}

fn load_tags(path: &Path) -> Result<TagSet, Box<dyn std::error::Error>> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| format!("reading tags from {}: {e}", path.display()))?;
    let tags = serde_json::from_str(&json)
        .map_err(|e| format!("parsing tags in {}: {e}", path.display()))?;
    Ok(tags)
}

fn diff(existing: &TagSet, desired: &TagSet, filters: &Filters) -> TagDiff {
    TagDiff::compute(existing, desired, &filters.to_tag_filters())
}
