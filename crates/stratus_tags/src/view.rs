//! The tag pair a resource reports back after a read.

use crate::config::DefaultTagsConfig;
use crate::tag_set::{TagFilter, TagSet};
use serde::Serialize;

/// Tags as seen by the user and as held on the remote resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TagView {
    /// Tags the user configured on the resource (defaults removed).
    pub tags: TagSet,
    /// Every managed tag on the resource, defaults included.
    pub tags_all: TagSet,
}

impl TagView {
    /// Builds the view from the tags returned by the platform.
    ///
    /// Keys matching `filters` (reserved prefixes, ignored keys) are dropped
    /// from both sides.
    pub fn from_remote(remote: &TagSet, filters: &[TagFilter], defaults: &DefaultTagsConfig) -> Self {
        let tags_all = remote.ignore(filters);
        Self {
            tags: defaults.remove_default_tags(&tags_all),
            tags_all,
        }
    }
}
