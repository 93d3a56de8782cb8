//! API Gateway v2 domain name resource.
//!
//! The lifecycle follows the provider pattern: mutate, wait for the domain to
//! report `AVAILABLE`, then read back the full state. Tags are reconciled on
//! update through the tag diff with the provider's reserved and ignored keys
//! filtered out.

use crate::api::{
    ApiError, CreateDomainNameInput, DomainNameApi, DomainNameConfigurationOutput,
    DomainNameOutput, MutualTlsAuthenticationInput, TaggingClient, UpdateDomainNameInput,
    DOMAIN_NAME_STATUS_AVAILABLE, DOMAIN_NAME_STATUS_UPDATING,
};
use crate::config::{ProviderConfig, WaitDefaults};
use crate::error::{ProviderError, ProviderResult};
use crate::timeouts::ResourceTimeouts;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use stratus_tags::{update_tags, TagSet, TagView};
use stratus_wait::{
    CancelToken, Clock, Observation, StateChangeConf, SystemClock, WaitError, WaitResult,
};
use tracing::{debug, info, warn};

const RESOURCE_TYPE: &str = "API Gateway v2 Domain Name";
const MAX_DOMAIN_NAME_LEN: usize = 512;

/// Endpoint type of a domain name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EndpointType {
    /// A regional endpoint.
    #[default]
    #[serde(rename = "REGIONAL", alias = "regional")]
    Regional,
}

impl EndpointType {
    /// The API value.
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointType::Regional => "REGIONAL",
        }
    }
}

impl fmt::Display for EndpointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EndpointType {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("REGIONAL") {
            Ok(EndpointType::Regional)
        } else {
            Err(ProviderError::InvalidConfig(format!(
                "unsupported endpoint type '{s}'"
            )))
        }
    }
}

/// TLS security policy of a domain name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SecurityPolicy {
    /// TLS 1.2.
    #[default]
    #[serde(rename = "TLS_1_2", alias = "tls_1_2")]
    Tls12,
}

impl SecurityPolicy {
    /// The API value.
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityPolicy::Tls12 => "TLS_1_2",
        }
    }
}

impl fmt::Display for SecurityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SecurityPolicy {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("TLS_1_2") {
            Ok(SecurityPolicy::Tls12)
        } else {
            Err(ProviderError::InvalidConfig(format!(
                "unsupported security policy '{s}'"
            )))
        }
    }
}

/// The user-configured endpoint of a domain name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainNameConfiguration {
    /// ACM certificate ARN.
    pub certificate_arn: String,
    /// Endpoint type.
    #[serde(default)]
    pub endpoint_type: EndpointType,
    /// TLS security policy.
    #[serde(default)]
    pub security_policy: SecurityPolicy,
    /// Certificate proving ownership; computed by the platform when unset.
    #[serde(default)]
    pub ownership_verification_certificate_arn: Option<String>,
}

impl DomainNameConfiguration {
    /// Creates a regional TLS 1.2 configuration for `certificate_arn`.
    pub fn new(certificate_arn: impl Into<String>) -> Self {
        Self {
            certificate_arn: certificate_arn.into(),
            endpoint_type: EndpointType::Regional,
            security_policy: SecurityPolicy::Tls12,
            ownership_verification_certificate_arn: None,
        }
    }

    /// Sets the ownership verification certificate.
    pub fn with_ownership_verification_certificate_arn(mut self, arn: impl Into<String>) -> Self {
        self.ownership_verification_certificate_arn = Some(arn.into());
        self
    }

    fn validate(&self) -> ProviderResult<()> {
        validate_arn("certificate_arn", &self.certificate_arn)?;
        if let Some(arn) = &self.ownership_verification_certificate_arn {
            validate_arn("ownership_verification_certificate_arn", arn)?;
        }
        Ok(())
    }

    fn expand(&self) -> DomainNameConfigurationOutput {
        DomainNameConfigurationOutput {
            certificate_arn: Some(self.certificate_arn.clone()),
            endpoint_type: Some(self.endpoint_type.as_str().to_string()),
            security_policy: Some(self.security_policy.as_str().to_string()),
            ownership_verification_certificate_arn: self
                .ownership_verification_certificate_arn
                .clone(),
            ..Default::default()
        }
    }

    /// Returns true if applying `self` over `state` would change anything.
    fn differs_from(&self, state: &DomainNameConfigurationState) -> bool {
        self.certificate_arn != state.certificate_arn
            || !self.endpoint_type.as_str().eq_ignore_ascii_case(&state.endpoint_type)
            || !self.security_policy.as_str().eq_ignore_ascii_case(&state.security_policy)
            || self
                .ownership_verification_certificate_arn
                .as_ref()
                .is_some_and(|arn| Some(arn) != state.ownership_verification_certificate_arn.as_ref())
    }
}

/// Mutual TLS authentication settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutualTlsAuthentication {
    /// Truststore location, e.g. `s3://bucket/truststore.pem`.
    pub truststore_uri: String,
    /// Truststore object version.
    #[serde(default)]
    pub truststore_version: Option<String>,
}

impl MutualTlsAuthentication {
    /// Creates settings for `truststore_uri`.
    pub fn new(truststore_uri: impl Into<String>) -> Self {
        Self {
            truststore_uri: truststore_uri.into(),
            truststore_version: None,
        }
    }

    /// Sets the truststore version.
    pub fn with_truststore_version(mut self, version: impl Into<String>) -> Self {
        self.truststore_version = Some(version.into());
        self
    }

    fn expand(&self) -> MutualTlsAuthenticationInput {
        MutualTlsAuthenticationInput {
            truststore_uri: Some(self.truststore_uri.clone()),
            truststore_version: self.truststore_version.clone(),
        }
    }

    fn flatten(input: &MutualTlsAuthenticationInput) -> Option<Self> {
        let uri = input.truststore_uri.as_deref().filter(|uri| !uri.is_empty())?;
        Some(Self {
            truststore_uri: uri.to_string(),
            truststore_version: input.truststore_version.clone(),
        })
    }
}

/// Desired state of a domain name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainNameConfig {
    /// The domain name. Changing it requires a new resource.
    pub domain_name: String,
    /// Endpoint configuration.
    pub configuration: DomainNameConfiguration,
    /// Mutual TLS settings.
    #[serde(default)]
    pub mutual_tls: Option<MutualTlsAuthentication>,
    /// Resource tags, before default tags are merged in.
    #[serde(default)]
    pub tags: TagSet,
}

impl DomainNameConfig {
    /// Creates a configuration without mutual TLS or tags.
    pub fn new(domain_name: impl Into<String>, configuration: DomainNameConfiguration) -> Self {
        Self {
            domain_name: domain_name.into(),
            configuration,
            mutual_tls: None,
            tags: TagSet::new(),
        }
    }

    /// Sets the mutual TLS settings.
    pub fn with_mutual_tls(mut self, mutual_tls: MutualTlsAuthentication) -> Self {
        self.mutual_tls = Some(mutual_tls);
        self
    }

    /// Sets the resource tags.
    pub fn with_tags(mut self, tags: TagSet) -> Self {
        self.tags = tags;
        self
    }

    /// Checks the configuration before any API call.
    pub fn validate(&self) -> ProviderResult<()> {
        let len = self.domain_name.len();
        if len == 0 || len > MAX_DOMAIN_NAME_LEN {
            return Err(ProviderError::InvalidConfig(format!(
                "domain_name must be between 1 and {MAX_DOMAIN_NAME_LEN} characters, got {len}"
            )));
        }
        if let Some(mtls) = &self.mutual_tls {
            if mtls.truststore_uri.is_empty() {
                return Err(ProviderError::InvalidConfig(
                    "mutual_tls.truststore_uri must not be empty".into(),
                ));
            }
        }
        self.configuration.validate()
    }
}

fn validate_arn(field: &str, arn: &str) -> ProviderResult<()> {
    let parts: Vec<&str> = arn.splitn(6, ':').collect();
    if parts.len() == 6 && parts[0] == "arn" && !parts[1].is_empty() && !parts[2].is_empty() {
        return Ok(());
    }
    Err(ProviderError::InvalidConfig(format!(
        "{field} is not a valid ARN: '{arn}'"
    )))
}

/// Endpoint configuration as read back from the platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DomainNameConfigurationState {
    /// ACM certificate ARN.
    pub certificate_arn: String,
    /// Endpoint type.
    pub endpoint_type: String,
    /// TLS security policy.
    pub security_policy: String,
    /// Certificate proving ownership.
    pub ownership_verification_certificate_arn: Option<String>,
    /// Hosted zone of the generated endpoint.
    pub hosted_zone_id: Option<String>,
    /// Generated endpoint host name.
    pub target_domain_name: Option<String>,
}

impl DomainNameConfigurationState {
    fn flatten(output: &DomainNameConfigurationOutput) -> Self {
        Self {
            certificate_arn: output.certificate_arn.clone().unwrap_or_default(),
            endpoint_type: output.endpoint_type.clone().unwrap_or_default(),
            security_policy: output.security_policy.clone().unwrap_or_default(),
            ownership_verification_certificate_arn: output
                .ownership_verification_certificate_arn
                .clone(),
            hosted_zone_id: output.hosted_zone_id.clone(),
            target_domain_name: output.api_gateway_domain_name.clone(),
        }
    }
}

/// Observed state of a domain name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainNameState {
    /// Resource identifier (the domain name).
    pub id: String,
    /// Resource ARN.
    pub arn: String,
    /// The domain name.
    pub domain_name: String,
    /// API mapping selection expression.
    pub api_mapping_selection_expression: Option<String>,
    /// Endpoint configuration.
    pub configuration: DomainNameConfigurationState,
    /// Mutual TLS settings.
    pub mutual_tls: Option<MutualTlsAuthentication>,
    /// User tags (defaults removed).
    pub tags: TagSet,
    /// Every managed tag, defaults included.
    pub tags_all: TagSet,
}

/// Reads a domain name, mapping "not found" to [`ProviderError::NotFound`].
pub fn find_domain_name<C: DomainNameApi + ?Sized>(
    client: &C,
    name: &str,
) -> ProviderResult<DomainNameOutput> {
    let output = client.get_domain_name(name).map_err(|source| match source {
        ApiError::NotFound(_) => ProviderError::NotFound {
            resource_type: RESOURCE_TYPE,
            id: name.to_string(),
        },
        source => ProviderError::Api {
            action: "reading",
            resource_type: RESOURCE_TYPE,
            id: name.to_string(),
            source,
        },
    })?;

    if output.domain_name_configurations.is_empty() {
        return Err(ProviderError::EmptyResult {
            resource_type: RESOURCE_TYPE,
            id: name.to_string(),
        });
    }
    Ok(output)
}

/// Refresh function reporting the status of the first endpoint configuration.
///
/// A missing domain is reported as absent rather than as an error.
pub fn status_domain_name<'a, C: DomainNameApi + ?Sized>(
    client: &'a C,
    name: &'a str,
) -> impl FnMut() -> ProviderResult<Observation<DomainNameOutput>> + 'a {
    move || match find_domain_name(client, name) {
        Ok(output) => {
            let status = output
                .domain_name_configurations
                .first()
                .and_then(|configuration| configuration.domain_name_status.clone())
                .unwrap_or_default();
            Ok(Observation::found(output, status))
        }
        Err(err) if err.is_not_found() => Ok(Observation::absent()),
        Err(err) => Err(err),
    }
}

/// Waits until a domain name reports `AVAILABLE`.
///
/// The status message of the domain is attached to timeout and
/// unexpected-state errors.
pub fn wait_domain_name_available<C: DomainNameApi + ?Sized>(
    client: &C,
    name: &str,
    timeout: Duration,
    waits: &WaitDefaults,
    clock: &dyn Clock,
    cancel: &CancelToken,
) -> WaitResult<DomainNameOutput> {
    let conf = StateChangeConf::new(timeout)
        .with_pending([DOMAIN_NAME_STATUS_UPDATING])
        .with_target([DOMAIN_NAME_STATUS_AVAILABLE])
        .with_backoff(waits.backoff())
        .with_not_found_checks(waits.not_found_checks)
        .with_status_message(|output: &DomainNameOutput| {
            output
                .domain_name_configurations
                .first()
                .and_then(|configuration| configuration.domain_name_status_message.clone())
                .filter(|message| !message.is_empty())
        });

    conf.wait_with_clock(clock, cancel, status_domain_name(client, name))?
        .ok_or(WaitError::NotFound {
            checks: waits.not_found_checks,
        })
}

/// Lifecycle handlers for the domain name resource.
pub struct DomainNameResource<C: ?Sized> {
    client: Arc<C>,
    config: ProviderConfig,
    timeouts: ResourceTimeouts,
    clock: Arc<dyn Clock>,
}

impl<C: DomainNameApi + ?Sized> DomainNameResource<C> {
    /// Creates handlers using `client` and the provider-wide `config`.
    ///
    /// Create defaults to 10 minutes and update to 60 minutes, before the
    /// configured overrides are applied.
    pub fn new(client: Arc<C>, config: ProviderConfig) -> Self {
        let timeouts = ResourceTimeouts::new()
            .with_create(Duration::from_secs(10 * 60))
            .with_update(Duration::from_secs(60 * 60))
            .apply(&config.timeouts);
        Self {
            client,
            config,
            timeouts,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the clock used by waits.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the timeouts.
    pub fn with_timeouts(mut self, timeouts: ResourceTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Gets the effective timeouts.
    pub fn timeouts(&self) -> &ResourceTimeouts {
        &self.timeouts
    }

    /// Builds the ARN of a domain name.
    pub fn arn(&self, id: &str) -> String {
        format!(
            "arn:{}:apigateway:{}::/domainnames/{id}",
            self.config.partition, self.config.region
        )
    }

    /// Creates the domain name, waits for it, and reads it back.
    pub fn create(
        &self,
        desired: &DomainNameConfig,
        cancel: &CancelToken,
    ) -> ProviderResult<DomainNameState> {
        desired.validate()?;
        let tags = self
            .config
            .default_tags
            .merge_tags(&desired.tags)
            .ignore_prefixes(self.config.reserved_tag_prefixes.iter().cloned());

        let input = CreateDomainNameInput {
            domain_name: desired.domain_name.clone(),
            domain_name_configurations: vec![desired.configuration.expand()],
            mutual_tls_authentication: desired.mutual_tls.as_ref().map(MutualTlsAuthentication::expand),
            tags,
        };
        let output = self
            .client
            .create_domain_name(&input)
            .map_err(|source| ProviderError::Api {
                action: "creating",
                resource_type: RESOURCE_TYPE,
                id: desired.domain_name.clone(),
                source,
            })?;
        let id = output.domain_name;
        info!(id = %id, "created domain name");

        self.wait_available("create", &id, self.timeouts.create, cancel)?;

        self.read(&id, true)?.ok_or_else(|| ProviderError::NotFound {
            resource_type: RESOURCE_TYPE,
            id,
        })
    }

    /// Reads the domain name.
    ///
    /// Returns `None` when an existing resource has disappeared so the caller
    /// can drop it from state. A missing resource is an error while
    /// `is_new` is set.
    pub fn read(&self, id: &str, is_new: bool) -> ProviderResult<Option<DomainNameState>> {
        let output = match find_domain_name(self.client.as_ref(), id) {
            Ok(output) => output,
            Err(err) if !is_new && err.is_not_found() => {
                warn!(id, "domain name not found, removing from state");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        let configuration = output
            .domain_name_configurations
            .first()
            .map(DomainNameConfigurationState::flatten)
            .unwrap_or_default();
        let view = TagView::from_remote(
            &output.tags,
            &self.config.tag_filters(),
            &self.config.default_tags,
        );

        Ok(Some(DomainNameState {
            id: id.to_string(),
            arn: self.arn(id),
            domain_name: output.domain_name,
            api_mapping_selection_expression: output.api_mapping_selection_expression,
            configuration,
            mutual_tls: output
                .mutual_tls_authentication
                .as_ref()
                .and_then(MutualTlsAuthentication::flatten),
            tags: view.tags,
            tags_all: view.tags_all,
        }))
    }

    /// Moves the domain name from `prior` to `desired`.
    ///
    /// Configuration changes are applied and awaited first; tag changes are
    /// reconciled afterwards against the prior `tags_all`.
    pub fn update(
        &self,
        prior: &DomainNameState,
        desired: &DomainNameConfig,
        cancel: &CancelToken,
    ) -> ProviderResult<DomainNameState> {
        desired.validate()?;
        if desired.domain_name != prior.domain_name {
            return Err(ProviderError::InvalidConfig(format!(
                "domain_name cannot change in place ({} -> {}); replace the resource",
                prior.domain_name, desired.domain_name
            )));
        }
        let id = prior.id.as_str();

        let configuration_changed = desired.configuration.differs_from(&prior.configuration);
        let mutual_tls_changed = desired.mutual_tls != prior.mutual_tls;
        if configuration_changed || mutual_tls_changed {
            let input = UpdateDomainNameInput {
                domain_name: id.to_string(),
                domain_name_configurations: vec![desired.configuration.expand()],
                mutual_tls_authentication: mutual_tls_changed
                    .then(|| mutual_tls_update(prior.mutual_tls.as_ref(), desired.mutual_tls.as_ref())),
            };
            self.client
                .update_domain_name(&input)
                .map_err(|source| ProviderError::Api {
                    action: "updating",
                    resource_type: RESOURCE_TYPE,
                    id: id.to_string(),
                    source,
                })?;
            debug!(id, configuration_changed, mutual_tls_changed, "updated domain name");

            self.wait_available("update", id, self.timeouts.update, cancel)?;
        }

        let tags_all = self.config.default_tags.merge_tags(&desired.tags);
        let diff = update_tags(
            &TaggingClient(self.client.as_ref()),
            &prior.arn,
            &prior.tags_all,
            &tags_all,
            &self.config.tag_filters(),
        )
        .map_err(|source| ProviderError::Tags {
            resource_type: RESOURCE_TYPE,
            id: id.to_string(),
            source,
        })?;
        if !diff.is_empty() {
            debug!(
                id,
                created = diff.to_create.len(),
                updated = diff.to_update.len(),
                deleted = diff.to_delete.len(),
                "reconciled tags"
            );
        }

        self.read(id, false)?.ok_or_else(|| ProviderError::NotFound {
            resource_type: RESOURCE_TYPE,
            id: id.to_string(),
        })
    }

    /// Deletes the domain name. A domain that is already gone is not an error.
    pub fn delete(&self, id: &str) -> ProviderResult<()> {
        debug!(id, "deleting domain name");
        match self.client.delete_domain_name(id) {
            Ok(()) => Ok(()),
            Err(ApiError::NotFound(_)) => {
                debug!(id, "domain name already deleted");
                Ok(())
            }
            Err(source) => Err(ProviderError::Api {
                action: "deleting",
                resource_type: RESOURCE_TYPE,
                id: id.to_string(),
                source,
            }),
        }
    }

    fn wait_available(
        &self,
        action: &'static str,
        id: &str,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> ProviderResult<DomainNameOutput> {
        wait_domain_name_available(
            self.client.as_ref(),
            id,
            timeout,
            &self.config.waits,
            self.clock.as_ref(),
            cancel,
        )
        .map_err(|source| ProviderError::Wait {
            action,
            resource_type: RESOURCE_TYPE,
            id: id.to_string(),
            source,
        })
    }
}

/// Builds the partial mutual TLS change sent on update.
///
/// Only fields that changed are sent; an empty truststore URI disables
/// mutual TLS.
fn mutual_tls_update(
    prior: Option<&MutualTlsAuthentication>,
    desired: Option<&MutualTlsAuthentication>,
) -> MutualTlsAuthenticationInput {
    let Some(desired) = desired else {
        return MutualTlsAuthenticationInput {
            truststore_uri: Some(String::new()),
            truststore_version: None,
        };
    };
    let Some(prior) = prior else {
        return desired.expand();
    };

    MutualTlsAuthenticationInput {
        truststore_uri: (desired.truststore_uri != prior.truststore_uri)
            .then(|| desired.truststore_uri.clone()),
        truststore_version: (desired.truststore_version != prior.truststore_version)
            .then(|| desired.truststore_version.clone().unwrap_or_default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::InMemoryDomainNameApi;
    use stratus_wait::ManualClock;

    const CERT: &str = "arn:aws:acm:us-east-1:123456789012:certificate/1111";

    fn resource(api: &Arc<InMemoryDomainNameApi>) -> DomainNameResource<InMemoryDomainNameApi> {
        DomainNameResource::new(Arc::clone(api), ProviderConfig::new())
            .with_clock(Arc::new(ManualClock::new()))
    }

    #[test]
    fn default_timeouts() {
        let api = Arc::new(InMemoryDomainNameApi::new());
        let resource = resource(&api);
        assert_eq!(resource.timeouts().create, Duration::from_secs(600));
        assert_eq!(resource.timeouts().update, Duration::from_secs(3600));
        assert_eq!(resource.timeouts().delete, Duration::from_secs(1200));
    }

    #[test]
    fn arn_format() {
        let api = Arc::new(InMemoryDomainNameApi::new());
        let config = ProviderConfig::new().with_region("eu-central-1");
        let resource = DomainNameResource::new(api, config);
        assert_eq!(
            resource.arn("api.example.com"),
            "arn:aws:apigateway:eu-central-1::/domainnames/api.example.com"
        );
    }

    #[test]
    fn validation() {
        let ok = DomainNameConfig::new("api.example.com", DomainNameConfiguration::new(CERT));
        assert!(ok.validate().is_ok());

        let empty = DomainNameConfig::new("", DomainNameConfiguration::new(CERT));
        assert!(matches!(empty.validate(), Err(ProviderError::InvalidConfig(_))));

        let long = DomainNameConfig::new("a".repeat(513), DomainNameConfiguration::new(CERT));
        assert!(long.validate().is_err());

        let bad_arn = DomainNameConfig::new("api.example.com", DomainNameConfiguration::new("cert"));
        assert!(bad_arn.validate().is_err());
    }

    #[test]
    fn enums_parse_case_insensitively() {
        assert_eq!("regional".parse::<EndpointType>().unwrap(), EndpointType::Regional);
        assert_eq!("TLS_1_2".parse::<SecurityPolicy>().unwrap(), SecurityPolicy::Tls12);
        assert!("EDGE".parse::<EndpointType>().is_err());
    }

    #[test]
    fn status_refresh_reports_absent() {
        let api = InMemoryDomainNameApi::new();
        let mut refresh = status_domain_name(&api, "missing.example.com");
        assert!(refresh().unwrap().is_absent());
    }

    #[test]
    fn find_maps_not_found() {
        let api = InMemoryDomainNameApi::new();
        let err = find_domain_name(&api, "missing.example.com").unwrap_err();
        assert!(matches!(err, ProviderError::NotFound { .. }));

        api.fail_operation("get_domain_name", ApiError::Service("boom".into()));
        let err = find_domain_name(&api, "missing.example.com").unwrap_err();
        assert!(matches!(err, ProviderError::Api { action: "reading", .. }));
    }

    #[test]
    fn wait_attaches_status_message() {
        let api = Arc::new(InMemoryDomainNameApi::new());
        let resource = resource(&api);
        let desired = DomainNameConfig::new("api.example.com", DomainNameConfiguration::new(CERT));
        resource.create(&desired, &CancelToken::new()).unwrap();

        api.force_status(
            "api.example.com",
            "PENDING_CERTIFICATE_REIMPORT",
            Some("certificate expired"),
        );
        let err = wait_domain_name_available(
            api.as_ref(),
            "api.example.com",
            Duration::from_secs(60),
            &WaitDefaults::default(),
            &ManualClock::new(),
            &CancelToken::new(),
        )
        .unwrap_err();

        assert!(matches!(err, WaitError::UnexpectedState { .. }));
        assert_eq!(err.last_error(), Some("certificate expired"));
    }

    #[test]
    fn mutual_tls_update_sends_changed_fields() {
        let prior = MutualTlsAuthentication::new("s3://bucket/a.pem").with_truststore_version("1");
        let desired = MutualTlsAuthentication::new("s3://bucket/a.pem").with_truststore_version("2");

        let input = mutual_tls_update(Some(&prior), Some(&desired));
        assert_eq!(input.truststore_uri, None);
        assert_eq!(input.truststore_version.as_deref(), Some("2"));

        let disable = mutual_tls_update(Some(&prior), None);
        assert_eq!(disable.truststore_uri.as_deref(), Some(""));

        let enable = mutual_tls_update(None, Some(&desired));
        assert_eq!(enable.truststore_uri.as_deref(), Some("s3://bucket/a.pem"));
    }

    #[test]
    fn config_deserializes_from_json() {
        let config: DomainNameConfig = serde_json::from_str(
            r#"{
                "domain_name": "api.example.com",
                "configuration": { "certificate_arn": "arn:aws:acm:us-east-1:123456789012:certificate/1111" },
                "tags": { "env": "prod" }
            }"#,
        )
        .unwrap();
        assert_eq!(config.configuration.endpoint_type, EndpointType::Regional);
        assert_eq!(config.configuration.security_policy, SecurityPolicy::Tls12);
        assert_eq!(config.tags.get("env"), Some("prod"));
        assert!(config.mutual_tls.is_none());
    }
}
