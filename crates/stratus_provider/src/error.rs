//! Error types for provider operations.

use crate::api::ApiError;
use stratus_tags::TagError;
use stratus_wait::WaitError;
use thiserror::Error;

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors surfaced by resource lifecycle handlers.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// A platform API call failed.
    #[error("{action} {resource_type} ({id}): {source}")]
    Api {
        /// What was being done ("creating", "reading", ...).
        action: &'static str,
        /// Human-readable resource type.
        resource_type: &'static str,
        /// Resource identifier.
        id: String,
        /// Underlying API error.
        #[source]
        source: ApiError,
    },

    /// The resource does not exist.
    #[error("{resource_type} ({id}) not found")]
    NotFound {
        /// Human-readable resource type.
        resource_type: &'static str,
        /// Resource identifier.
        id: String,
    },

    /// The API answered without the data the resource needs.
    #[error("empty result reading {resource_type} ({id})")]
    EmptyResult {
        /// Human-readable resource type.
        resource_type: &'static str,
        /// Resource identifier.
        id: String,
    },

    /// Waiting for the resource to settle failed.
    #[error("waiting for {resource_type} ({id}) {action}: {source}")]
    Wait {
        /// The lifecycle step being awaited ("create", "update", ...).
        action: &'static str,
        /// Human-readable resource type.
        resource_type: &'static str,
        /// Resource identifier.
        id: String,
        /// Underlying wait error.
        #[source]
        source: WaitError,
    },

    /// Reconciling tags failed.
    #[error("updating {resource_type} ({id}) tags: {source}")]
    Tags {
        /// Human-readable resource type.
        resource_type: &'static str,
        /// Resource identifier.
        id: String,
        /// Underlying tag error.
        #[source]
        source: TagError,
    },

    /// The resource or provider configuration is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Reading a configuration file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing a configuration document failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProviderError {
    /// Returns true if the resource does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            ProviderError::NotFound { .. } => true,
            ProviderError::Api { source, .. } => source.is_not_found(),
            ProviderError::Wait { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Returns true if the error is worth retrying as a whole operation.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Api { source, .. } => source.is_retryable(),
            ProviderError::Tags { source, .. } => std::error::Error::source(source)
                .and_then(|cause| cause.downcast_ref::<ApiError>())
                .is_some_and(ApiError::is_retryable),
            _ => false,
        }
    }
}
