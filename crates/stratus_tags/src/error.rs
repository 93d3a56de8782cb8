//! Error types for tag reconciliation.

use thiserror::Error;

/// Boxed error returned by tag writers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for tag operations.
pub type TagResult<T> = Result<T, TagError>;

/// Errors that can occur while applying a tag diff.
#[derive(Error, Debug)]
pub enum TagError {
    /// Removing tags failed. Nothing was written.
    #[error("untagging resource ({resource}): {source}")]
    Remove {
        /// Resource identifier.
        resource: String,
        /// Keys that were to be removed.
        keys: Vec<String>,
        /// Error returned by the writer.
        #[source]
        source: BoxError,
    },

    /// Adding or updating tags failed.
    #[error("tagging resource ({resource}): {source}")]
    Upsert {
        /// Resource identifier.
        resource: String,
        /// Keys that were to be created or updated.
        keys: Vec<String>,
        /// Keys already removed before the failure.
        removed: Vec<String>,
        /// Error returned by the writer.
        #[source]
        source: BoxError,
    },
}

impl TagError {
    /// Returns the resource the failing call targeted.
    pub fn resource(&self) -> &str {
        match self {
            TagError::Remove { resource, .. } | TagError::Upsert { resource, .. } => resource,
        }
    }

    /// Returns true if part of the diff was applied before the failure.
    pub fn is_partial(&self) -> bool {
        match self {
            TagError::Remove { .. } => false,
            TagError::Upsert { removed, .. } => !removed.is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = TagError::Remove {
            resource: "arn:aws:apigateway:us-east-1::/domainnames/api.example.com".into(),
            keys: vec!["env".into()],
            source: "access denied".into(),
        };
        assert_eq!(
            err.to_string(),
            "untagging resource (arn:aws:apigateway:us-east-1::/domainnames/api.example.com): access denied"
        );
        assert!(!err.is_partial());
    }

    #[test]
    fn partial_upsert() {
        let err = TagError::Upsert {
            resource: "r-1".into(),
            keys: vec!["team".into()],
            removed: vec!["env".into()],
            source: "throttled".into(),
        };
        assert!(err.is_partial());
        assert_eq!(err.resource(), "r-1");
    }
}
