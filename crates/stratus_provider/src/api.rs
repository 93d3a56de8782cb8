//! Platform API surface used by the domain name resource.

use serde::{Deserialize, Serialize};
use stratus_tags::{BoxError, TagSet, TagWriter};
use thiserror::Error;

/// The domain name is ready.
pub const DOMAIN_NAME_STATUS_AVAILABLE: &str = "AVAILABLE";
/// The domain name configuration is being applied.
pub const DOMAIN_NAME_STATUS_UPDATING: &str = "UPDATING";
/// The certificate must be reimported before the domain can be used.
pub const DOMAIN_NAME_STATUS_PENDING_CERTIFICATE_REIMPORT: &str = "PENDING_CERTIFICATE_REIMPORT";
/// Ownership of the domain has not been verified yet.
pub const DOMAIN_NAME_STATUS_PENDING_OWNERSHIP_VERIFICATION: &str =
    "PENDING_OWNERSHIP_VERIFICATION";

/// Errors returned by the platform API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The requested object does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request conflicts with the current state of the object.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The request was rejected by rate limiting.
    #[error("throttled: {0}")]
    Throttled(String),

    /// The request was malformed.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Any other failure.
    #[error("service error: {0}")]
    Service(String),
}

impl ApiError {
    /// Returns true if the object does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }

    /// Returns true if the call may succeed when repeated.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Throttled(_) | ApiError::Service(_))
    }
}

/// Mutual TLS settings sent to the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutualTlsAuthenticationInput {
    /// Truststore location; an empty string disables mutual TLS.
    pub truststore_uri: Option<String>,
    /// Truststore object version.
    pub truststore_version: Option<String>,
}

/// One endpoint configuration of a domain name, as reported by the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainNameConfigurationOutput {
    /// Certificate ARN.
    pub certificate_arn: Option<String>,
    /// Endpoint type, e.g. `REGIONAL`.
    pub endpoint_type: Option<String>,
    /// TLS security policy, e.g. `TLS_1_2`.
    pub security_policy: Option<String>,
    /// Certificate used to prove domain ownership.
    pub ownership_verification_certificate_arn: Option<String>,
    /// Hosted zone of the generated endpoint.
    pub hosted_zone_id: Option<String>,
    /// Generated endpoint host name.
    pub api_gateway_domain_name: Option<String>,
    /// Domain name status.
    pub domain_name_status: Option<String>,
    /// Detail explaining the status.
    pub domain_name_status_message: Option<String>,
}

/// A domain name as reported by the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainNameOutput {
    /// The domain name.
    pub domain_name: String,
    /// API mapping selection expression.
    pub api_mapping_selection_expression: Option<String>,
    /// Endpoint configurations.
    pub domain_name_configurations: Vec<DomainNameConfigurationOutput>,
    /// Mutual TLS settings.
    pub mutual_tls_authentication: Option<MutualTlsAuthenticationInput>,
    /// Tags on the domain name.
    pub tags: TagSet,
}

/// Input for creating a domain name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateDomainNameInput {
    /// The domain name.
    pub domain_name: String,
    /// Endpoint configurations.
    pub domain_name_configurations: Vec<DomainNameConfigurationOutput>,
    /// Mutual TLS settings.
    pub mutual_tls_authentication: Option<MutualTlsAuthenticationInput>,
    /// Initial tags.
    pub tags: TagSet,
}

/// Input for updating a domain name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateDomainNameInput {
    /// The domain name.
    pub domain_name: String,
    /// Replacement endpoint configurations.
    pub domain_name_configurations: Vec<DomainNameConfigurationOutput>,
    /// Mutual TLS changes; `None` leaves them as they are.
    pub mutual_tls_authentication: Option<MutualTlsAuthenticationInput>,
}

/// Client for the domain name API.
///
/// Implementations own retries of transient errors, so every method returns
/// the final outcome of the call.
pub trait DomainNameApi: Send + Sync {
    /// Creates a domain name.
    fn create_domain_name(&self, input: &CreateDomainNameInput) -> Result<DomainNameOutput, ApiError>;

    /// Describes a domain name.
    fn get_domain_name(&self, domain_name: &str) -> Result<DomainNameOutput, ApiError>;

    /// Updates a domain name.
    fn update_domain_name(&self, input: &UpdateDomainNameInput) -> Result<DomainNameOutput, ApiError>;

    /// Deletes a domain name.
    fn delete_domain_name(&self, domain_name: &str) -> Result<(), ApiError>;

    /// Adds or overwrites tags on a resource ARN.
    fn tag_resource(&self, arn: &str, tags: &TagSet) -> Result<(), ApiError>;

    /// Removes tag keys from a resource ARN.
    fn untag_resource(&self, arn: &str, keys: &[String]) -> Result<(), ApiError>;
}

/// Exposes a [`DomainNameApi`] client as a [`TagWriter`].
pub struct TaggingClient<'a, C: ?Sized>(pub &'a C);

impl<C: DomainNameApi + ?Sized> TagWriter for TaggingClient<'_, C> {
    fn remove_tags(&self, resource: &str, keys: &[String]) -> Result<(), BoxError> {
        self.0.untag_resource(resource, keys).map_err(Into::into)
    }

    fn upsert_tags(&self, resource: &str, tags: &TagSet) -> Result<(), BoxError> {
        self.0.tag_resource(resource, tags).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_classification() {
        assert!(ApiError::NotFound("x".into()).is_not_found());
        assert!(ApiError::Throttled("x".into()).is_retryable());
        assert!(!ApiError::BadRequest("x".into()).is_retryable());
        assert!(!ApiError::Conflict("x".into()).is_not_found());
    }
}
