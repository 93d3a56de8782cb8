//! In-memory domain name API for tests and simulations.

use crate::api::{
    ApiError, CreateDomainNameInput, DomainNameApi, DomainNameConfigurationOutput,
    DomainNameOutput, MutualTlsAuthenticationInput, UpdateDomainNameInput,
    DOMAIN_NAME_STATUS_AVAILABLE, DOMAIN_NAME_STATUS_UPDATING,
};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use stratus_tags::TagSet;

const API_MAPPING_SELECTION_EXPRESSION: &str = "$request.basepath";
const SIMULATED_HOSTED_ZONE_ID: &str = "Z1UJRXOUMOOFQ8";

/// A stored domain name plus its remaining time in `UPDATING`.
#[derive(Debug, Clone)]
struct Entry {
    output: DomainNameOutput,
    reads_until_available: u32,
}

impl Entry {
    fn set_status(&mut self, status: &str, message: Option<String>) {
        for configuration in &mut self.output.domain_name_configurations {
            configuration.domain_name_status = Some(status.to_string());
            configuration.domain_name_status_message = message.clone();
        }
    }
}

/// An in-memory [`DomainNameApi`].
///
/// After a create or update the domain reports `UPDATING` for a configurable
/// number of reads, then `AVAILABLE`. Failures can be injected per operation.
#[derive(Debug)]
pub struct InMemoryDomainNameApi {
    region: String,
    updating_reads: u32,
    domains: RwLock<BTreeMap<String, Entry>>,
    failures: RwLock<HashMap<&'static str, ApiError>>,
    calls: RwLock<Vec<String>>,
    next_endpoint: RwLock<u64>,
}

impl InMemoryDomainNameApi {
    /// Creates an empty API that stays `UPDATING` for two reads.
    pub fn new() -> Self {
        Self {
            region: "us-east-1".into(),
            updating_reads: 2,
            domains: RwLock::new(BTreeMap::new()),
            failures: RwLock::new(HashMap::new()),
            calls: RwLock::new(Vec::new()),
            next_endpoint: RwLock::new(1),
        }
    }

    /// Sets how many reads report `UPDATING` after a create or update.
    pub fn with_updating_reads(mut self, reads: u32) -> Self {
        self.updating_reads = reads;
        self
    }

    /// Sets the region used in generated endpoint names.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Makes every subsequent call of `operation` fail with `error`.
    ///
    /// `operation` is the trait method name, e.g. `"update_domain_name"`.
    pub fn fail_operation(&self, operation: &'static str, error: ApiError) {
        self.failures.write().insert(operation, error);
    }

    /// Clears injected failures.
    pub fn clear_failures(&self) {
        self.failures.write().clear();
    }

    /// Pins a domain to `status` until the next create or update.
    pub fn force_status(&self, domain_name: &str, status: &str, message: Option<&str>) {
        if let Some(entry) = self.domains.write().get_mut(domain_name) {
            entry.reads_until_available = 0;
            entry.set_status(status, message.map(str::to_string));
        }
    }

    /// Removes a domain behind the provider's back.
    pub fn remove_out_of_band(&self, domain_name: &str) -> bool {
        self.domains.write().remove(domain_name).is_some()
    }

    /// Sets a tag behind the provider's back.
    pub fn set_remote_tag(&self, domain_name: &str, key: &str, value: &str) {
        if let Some(entry) = self.domains.write().get_mut(domain_name) {
            entry.output.tags.insert(key, value);
        }
    }

    /// Gets a domain without counting as a read.
    pub fn domain(&self, domain_name: &str) -> Option<DomainNameOutput> {
        self.domains
            .read()
            .get(domain_name)
            .map(|entry| entry.output.clone())
    }

    /// Gets the tags of a domain.
    pub fn tags(&self, domain_name: &str) -> TagSet {
        self.domain(domain_name)
            .map(|output| output.tags)
            .unwrap_or_default()
    }

    /// Returns true if the domain exists.
    pub fn contains(&self, domain_name: &str) -> bool {
        self.domains.read().contains_key(domain_name)
    }

    /// Names of the calls made so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().clone()
    }

    fn record(&self, operation: &'static str) -> Result<(), ApiError> {
        self.calls.write().push(operation.to_string());
        match self.failures.read().get(operation) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn initial_status(&self) -> (&'static str, u32) {
        if self.updating_reads == 0 {
            (DOMAIN_NAME_STATUS_AVAILABLE, 0)
        } else {
            (DOMAIN_NAME_STATUS_UPDATING, self.updating_reads)
        }
    }

    fn endpoint_name(&self) -> String {
        let mut next = self.next_endpoint.write();
        let id = *next;
        *next += 1;
        format!("d-{id:010x}.execute-api.{}.amazonaws.com", self.region)
    }

    /// Endpoints already assigned in `current` are kept, position by position.
    fn stored_configurations(
        &self,
        requested: &[DomainNameConfigurationOutput],
        current: &[DomainNameConfigurationOutput],
        status: &str,
    ) -> Vec<DomainNameConfigurationOutput> {
        requested
            .iter()
            .enumerate()
            .map(|(index, configuration)| DomainNameConfigurationOutput {
                certificate_arn: configuration.certificate_arn.clone(),
                endpoint_type: configuration.endpoint_type.clone(),
                security_policy: configuration.security_policy.clone(),
                ownership_verification_certificate_arn: configuration
                    .ownership_verification_certificate_arn
                    .clone()
                    .or_else(|| configuration.certificate_arn.clone()),
                hosted_zone_id: Some(SIMULATED_HOSTED_ZONE_ID.to_string()),
                api_gateway_domain_name: current
                    .get(index)
                    .and_then(|existing| existing.api_gateway_domain_name.clone())
                    .or_else(|| Some(self.endpoint_name())),
                domain_name_status: Some(status.to_string()),
                domain_name_status_message: None,
            })
            .collect()
    }
}

impl Default for InMemoryDomainNameApi {
    fn default() -> Self {
        Self::new()
    }
}

fn domain_from_arn(arn: &str) -> Result<&str, ApiError> {
    arn.rsplit_once("/domainnames/")
        .map(|(_, name)| name)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("invalid resource ARN: {arn}")))
}

fn mutual_tls_from_input(
    input: &Option<MutualTlsAuthenticationInput>,
) -> Option<MutualTlsAuthenticationInput> {
    input
        .as_ref()
        .filter(|mtls| mtls.truststore_uri.as_deref().is_some_and(|uri| !uri.is_empty()))
        .cloned()
}

impl DomainNameApi for InMemoryDomainNameApi {
    fn create_domain_name(
        &self,
        input: &CreateDomainNameInput,
    ) -> Result<DomainNameOutput, ApiError> {
        self.record("create_domain_name")?;
        if input.domain_name.is_empty() {
            return Err(ApiError::BadRequest("domain name is required".into()));
        }
        if input.domain_name_configurations.is_empty() {
            return Err(ApiError::BadRequest(
                "at least one domain name configuration is required".into(),
            ));
        }

        let mut domains = self.domains.write();
        if domains.contains_key(&input.domain_name) {
            return Err(ApiError::Conflict(format!(
                "domain name {} already exists",
                input.domain_name
            )));
        }

        let (status, reads_until_available) = self.initial_status();
        let output = DomainNameOutput {
            domain_name: input.domain_name.clone(),
            api_mapping_selection_expression: Some(API_MAPPING_SELECTION_EXPRESSION.into()),
            domain_name_configurations: self
                .stored_configurations(&input.domain_name_configurations, &[], status),
            mutual_tls_authentication: mutual_tls_from_input(&input.mutual_tls_authentication),
            tags: input.tags.clone(),
        };
        domains.insert(
            input.domain_name.clone(),
            Entry {
                output: output.clone(),
                reads_until_available,
            },
        );
        tracing::debug!(domain_name = %input.domain_name, status, "simulated create");
        Ok(output)
    }

    fn get_domain_name(&self, domain_name: &str) -> Result<DomainNameOutput, ApiError> {
        self.record("get_domain_name")?;
        let mut domains = self.domains.write();
        let entry = domains
            .get_mut(domain_name)
            .ok_or_else(|| ApiError::NotFound(format!("domain name {domain_name} not found")))?;

        if entry.reads_until_available > 0 {
            entry.reads_until_available -= 1;
            if entry.reads_until_available == 0 {
                entry.set_status(DOMAIN_NAME_STATUS_AVAILABLE, None);
            }
            // The read that spends the last count still observes UPDATING.
            let mut output = entry.output.clone();
            for configuration in &mut output.domain_name_configurations {
                configuration.domain_name_status = Some(DOMAIN_NAME_STATUS_UPDATING.into());
            }
            return Ok(output);
        }
        Ok(entry.output.clone())
    }

    fn update_domain_name(
        &self,
        input: &UpdateDomainNameInput,
    ) -> Result<DomainNameOutput, ApiError> {
        self.record("update_domain_name")?;
        let mut domains = self.domains.write();
        let entry = domains.get_mut(&input.domain_name).ok_or_else(|| {
            ApiError::NotFound(format!("domain name {} not found", input.domain_name))
        })?;

        let (status, reads_until_available) = self.initial_status();
        if !input.domain_name_configurations.is_empty() {
            entry.output.domain_name_configurations = self.stored_configurations(
                &input.domain_name_configurations,
                &entry.output.domain_name_configurations,
                status,
            );
        }
        if let Some(mtls) = &input.mutual_tls_authentication {
            match mtls.truststore_uri.as_deref() {
                Some("") => entry.output.mutual_tls_authentication = None,
                _ => {
                    let current = entry
                        .output
                        .mutual_tls_authentication
                        .get_or_insert_with(MutualTlsAuthenticationInput::default);
                    if let Some(uri) = &mtls.truststore_uri {
                        current.truststore_uri = Some(uri.clone());
                    }
                    if let Some(version) = &mtls.truststore_version {
                        current.truststore_version =
                            Some(version.clone()).filter(|version| !version.is_empty());
                    }
                }
            }
        }

        entry.reads_until_available = reads_until_available;
        entry.set_status(status, None);
        tracing::debug!(domain_name = %input.domain_name, status, "simulated update");
        Ok(entry.output.clone())
    }

    fn delete_domain_name(&self, domain_name: &str) -> Result<(), ApiError> {
        self.record("delete_domain_name")?;
        self.domains
            .write()
            .remove(domain_name)
            .map(|_| ())
            .ok_or_else(|| ApiError::NotFound(format!("domain name {domain_name} not found")))
    }

    fn tag_resource(&self, arn: &str, tags: &TagSet) -> Result<(), ApiError> {
        self.record("tag_resource")?;
        let name = domain_from_arn(arn)?;
        let mut domains = self.domains.write();
        let entry = domains
            .get_mut(name)
            .ok_or_else(|| ApiError::NotFound(format!("resource {arn} not found")))?;
        for (key, value) in tags {
            entry.output.tags.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    fn untag_resource(&self, arn: &str, keys: &[String]) -> Result<(), ApiError> {
        self.record("untag_resource")?;
        let name = domain_from_arn(arn)?;
        let mut domains = self.domains.write();
        let entry = domains
            .get_mut(name)
            .ok_or_else(|| ApiError::NotFound(format!("resource {arn} not found")))?;
        for key in keys {
            entry.output.tags.remove(key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_input(name: &str) -> CreateDomainNameInput {
        CreateDomainNameInput {
            domain_name: name.into(),
            domain_name_configurations: vec![DomainNameConfigurationOutput {
                certificate_arn: Some("arn:aws:acm:us-east-1:123456789012:certificate/abc".into()),
                endpoint_type: Some("REGIONAL".into()),
                security_policy: Some("TLS_1_2".into()),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn status(api: &InMemoryDomainNameApi, name: &str) -> String {
        api.get_domain_name(name).unwrap().domain_name_configurations[0]
            .domain_name_status
            .clone()
            .unwrap()
    }

    #[test]
    fn updating_then_available() {
        let api = InMemoryDomainNameApi::new().with_updating_reads(2);
        api.create_domain_name(&create_input("api.example.com")).unwrap();

        assert_eq!(status(&api, "api.example.com"), "UPDATING");
        assert_eq!(status(&api, "api.example.com"), "UPDATING");
        assert_eq!(status(&api, "api.example.com"), "AVAILABLE");
        assert_eq!(status(&api, "api.example.com"), "AVAILABLE");
    }

    #[test]
    fn create_conflict_and_delete_not_found() {
        let api = InMemoryDomainNameApi::new();
        api.create_domain_name(&create_input("api.example.com")).unwrap();

        let err = api
            .create_domain_name(&create_input("api.example.com"))
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        api.delete_domain_name("api.example.com").unwrap();
        assert!(api.delete_domain_name("api.example.com").unwrap_err().is_not_found());
    }

    fn endpoint(api: &InMemoryDomainNameApi, name: &str) -> String {
        api.get_domain_name(name).unwrap().domain_name_configurations[0]
            .api_gateway_domain_name
            .clone()
            .unwrap()
    }

    #[test]
    fn update_of_missing_domain_assigns_no_endpoint() {
        let api = InMemoryDomainNameApi::new().with_updating_reads(0);
        let err = api
            .update_domain_name(&UpdateDomainNameInput {
                domain_name: "missing.example.com".into(),
                domain_name_configurations: create_input("missing.example.com")
                    .domain_name_configurations,
                ..Default::default()
            })
            .unwrap_err();
        assert!(err.is_not_found());

        api.create_domain_name(&create_input("api.example.com")).unwrap();
        assert_eq!(
            endpoint(&api, "api.example.com"),
            "d-0000000001.execute-api.us-east-1.amazonaws.com"
        );
    }

    #[test]
    fn update_keeps_assigned_endpoints() {
        let api = InMemoryDomainNameApi::new().with_updating_reads(0);
        api.create_domain_name(&create_input("api.example.com")).unwrap();
        let before = endpoint(&api, "api.example.com");

        let mut configurations = create_input("api.example.com").domain_name_configurations;
        configurations[0].security_policy = Some("TLS_1_0".into());
        api.update_domain_name(&UpdateDomainNameInput {
            domain_name: "api.example.com".into(),
            domain_name_configurations: configurations,
            ..Default::default()
        })
        .unwrap();

        assert_eq!(endpoint(&api, "api.example.com"), before);
        api.create_domain_name(&create_input("other.example.com")).unwrap();
        assert_eq!(
            endpoint(&api, "other.example.com"),
            "d-0000000002.execute-api.us-east-1.amazonaws.com"
        );
    }

    #[test]
    fn tagging_by_arn() {
        let api = InMemoryDomainNameApi::new();
        api.create_domain_name(&create_input("api.example.com")).unwrap();
        let arn = "arn:aws:apigateway:us-east-1::/domainnames/api.example.com";

        let tags: TagSet = [("env", "prod"), ("team", "core")].into_iter().collect();
        api.tag_resource(arn, &tags).unwrap();
        api.untag_resource(arn, &["team".to_string()]).unwrap();

        let expected: TagSet = [("env", "prod")].into_iter().collect();
        assert_eq!(api.tags("api.example.com"), expected);

        let err = api.tag_resource("arn:aws:apigateway:us-east-1::/apis/x", &tags);
        assert!(matches!(err, Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn update_disables_mutual_tls() {
        let api = InMemoryDomainNameApi::new().with_updating_reads(0);
        let mut input = create_input("api.example.com");
        input.mutual_tls_authentication = Some(MutualTlsAuthenticationInput {
            truststore_uri: Some("s3://bucket/truststore.pem".into()),
            truststore_version: None,
        });
        api.create_domain_name(&input).unwrap();
        assert!(api.domain("api.example.com").unwrap().mutual_tls_authentication.is_some());

        api.update_domain_name(&UpdateDomainNameInput {
            domain_name: "api.example.com".into(),
            domain_name_configurations: input.domain_name_configurations.clone(),
            mutual_tls_authentication: Some(MutualTlsAuthenticationInput {
                truststore_uri: Some(String::new()),
                truststore_version: None,
            }),
        })
        .unwrap();
        assert!(api.domain("api.example.com").unwrap().mutual_tls_authentication.is_none());
    }

    #[test]
    fn injected_failures() {
        let api = InMemoryDomainNameApi::new();
        api.fail_operation("create_domain_name", ApiError::Throttled("slow down".into()));

        let err = api
            .create_domain_name(&create_input("api.example.com"))
            .unwrap_err();
        assert!(err.is_retryable());

        api.clear_failures();
        api.create_domain_name(&create_input("api.example.com")).unwrap();
        assert_eq!(api.calls(), vec!["create_domain_name", "create_domain_name"]);
    }
}
