//! # Stratus Tags
//!
//! Key/value tag reconciliation for cloud resources.
//!
//! This crate provides:
//! - [`TagSet`], an order-irrelevant key/value collection
//! - Filters for platform-reserved and user-ignored keys
//! - Default (provider-wide) tag merging and removal
//! - [`TagDiff`], the minimal create/update/delete work between two sets
//! - Applying a diff through a [`TagWriter`]
//!
//! ## Key Invariants
//!
//! - Filtered keys take part in neither the diff nor the apply
//! - Equal key and value on both sides produce no operation
//! - Create, update and delete partitions never share a key
//! - Keys and values compare by exact byte equality
//! - Re-running a diff after a partial apply yields the remaining work

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod diff;
mod error;
mod tag_set;
mod view;
mod writer;

pub use config::{DefaultTagsConfig, IgnoreTagsConfig};
pub use diff::{update_tags, TagDiff};
pub use error::{BoxError, TagError, TagResult};
pub use tag_set::{TagFilter, TagSet, PLATFORM_TAG_PREFIX};
pub use view::TagView;
pub use writer::{FnTagWriter, MemoryTagWriter, TagWriter};
