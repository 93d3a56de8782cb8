//! # Stratus Provider
//!
//! Provider configuration and reference resource lifecycles.
//!
//! This crate provides:
//! - Provider-wide configuration (default tags, ignored tags, timeouts)
//! - Per-resource timeout defaults
//! - The API Gateway v2 domain name resource as a worked caller of the
//!   waiter and the tag reconciler
//! - An in-memory domain name API for tests and simulations
//!
//! ## Architecture
//!
//! Lifecycle handlers receive their API client explicitly. Each mutating call
//! that completes asynchronously on the platform is followed by a
//! [`StateChangeConf`](stratus_wait::StateChangeConf) wait, and tag changes go
//! through [`update_tags`](stratus_tags::update_tags).

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod api;
mod config;
mod domain_name;
mod error;
mod mock;
mod timeouts;

pub use api::{
    ApiError, CreateDomainNameInput, DomainNameApi, DomainNameConfigurationOutput,
    DomainNameOutput, MutualTlsAuthenticationInput, TaggingClient, UpdateDomainNameInput,
    DOMAIN_NAME_STATUS_AVAILABLE, DOMAIN_NAME_STATUS_PENDING_CERTIFICATE_REIMPORT,
    DOMAIN_NAME_STATUS_PENDING_OWNERSHIP_VERIFICATION, DOMAIN_NAME_STATUS_UPDATING,
};
pub use config::{ProviderConfig, TimeoutOverrides, WaitDefaults};
pub use domain_name::{
    find_domain_name, status_domain_name, wait_domain_name_available, DomainNameConfig,
    DomainNameConfiguration, DomainNameConfigurationState, DomainNameResource, DomainNameState,
    EndpointType, MutualTlsAuthentication, SecurityPolicy,
};
pub use error::{ProviderError, ProviderResult};
pub use mock::InMemoryDomainNameApi;
pub use timeouts::ResourceTimeouts;
