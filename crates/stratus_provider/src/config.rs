//! Provider configuration.

use crate::error::{ProviderError, ProviderResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use stratus_tags::{DefaultTagsConfig, IgnoreTagsConfig, TagFilter, PLATFORM_TAG_PREFIX};
use stratus_wait::Backoff;

/// Provider-wide settings shared by every resource handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Partition used to build ARNs.
    pub partition: String,
    /// Region used to build ARNs.
    pub region: String,
    /// Tags added to every resource.
    pub default_tags: DefaultTagsConfig,
    /// Tags the provider never manages.
    pub ignore_tags: IgnoreTagsConfig,
    /// Key prefixes reserved by the platform.
    pub reserved_tag_prefixes: Vec<String>,
    /// Timeout overrides applied on top of each resource's defaults.
    pub timeouts: TimeoutOverrides,
    /// Polling behaviour for state-change waits.
    pub waits: WaitDefaults,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            partition: "aws".into(),
            region: "us-east-1".into(),
            default_tags: DefaultTagsConfig::default(),
            ignore_tags: IgnoreTagsConfig::default(),
            reserved_tag_prefixes: vec![PLATFORM_TAG_PREFIX.to_string()],
            timeouts: TimeoutOverrides::default(),
            waits: WaitDefaults::default(),
        }
    }
}

impl ProviderConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Sets the default tags.
    pub fn with_default_tags(mut self, default_tags: DefaultTagsConfig) -> Self {
        self.default_tags = default_tags;
        self
    }

    /// Sets the ignored tags.
    pub fn with_ignore_tags(mut self, ignore_tags: IgnoreTagsConfig) -> Self {
        self.ignore_tags = ignore_tags;
        self
    }

    /// Sets the wait defaults.
    pub fn with_waits(mut self, waits: WaitDefaults) -> Self {
        self.waits = waits;
        self
    }

    /// Parses a JSON document.
    pub fn from_json_str(json: &str) -> ProviderResult<Self> {
        let config: ProviderConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> ProviderResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "loaded provider configuration");
        Self::from_json_str(&json)
    }

    /// Checks values that serde cannot.
    pub fn validate(&self) -> ProviderResult<()> {
        if self.partition.is_empty() || self.region.is_empty() {
            return Err(ProviderError::InvalidConfig(
                "partition and region must not be empty".into(),
            ));
        }
        if self.reserved_tag_prefixes.iter().any(String::is_empty) {
            return Err(ProviderError::InvalidConfig(
                "reserved tag prefixes must not be empty".into(),
            ));
        }
        if self.waits.min_delay_ms > self.waits.max_delay_ms {
            return Err(ProviderError::InvalidConfig(format!(
                "waits.min_delay_ms ({}) exceeds waits.max_delay_ms ({})",
                self.waits.min_delay_ms, self.waits.max_delay_ms
            )));
        }
        Ok(())
    }

    /// Filters excluding reserved and ignored keys from every tag diff.
    pub fn tag_filters(&self) -> Vec<TagFilter> {
        self.reserved_tag_prefixes
            .iter()
            .cloned()
            .map(TagFilter::Prefix)
            .chain(self.ignore_tags.filters())
            .collect()
    }
}

/// Timeout overrides in seconds. Unset fields keep the resource default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutOverrides {
    /// Create timeout.
    pub create_secs: Option<u64>,
    /// Read timeout.
    pub read_secs: Option<u64>,
    /// Update timeout.
    pub update_secs: Option<u64>,
    /// Delete timeout.
    pub delete_secs: Option<u64>,
}

/// Polling settings for state-change waits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitDefaults {
    /// Delay after the first pending observation, in milliseconds.
    pub min_delay_ms: u64,
    /// Maximum delay between refreshes, in milliseconds.
    pub max_delay_ms: u64,
    /// Consecutive "not found" reads tolerated right after a create.
    pub not_found_checks: u32,
}

impl Default for WaitDefaults {
    fn default() -> Self {
        Self {
            min_delay_ms: 100,
            max_delay_ms: 10_000,
            not_found_checks: 20,
        }
    }
}

impl WaitDefaults {
    /// Creates wait defaults with the given delay bounds.
    pub fn new(min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            min_delay_ms: u64::try_from(min_delay.as_millis()).unwrap_or(u64::MAX),
            max_delay_ms: u64::try_from(max_delay.as_millis()).unwrap_or(u64::MAX),
            ..Self::default()
        }
    }

    /// Sets the number of tolerated "not found" reads.
    pub fn with_not_found_checks(mut self, checks: u32) -> Self {
        self.not_found_checks = checks;
        self
    }

    /// Backoff schedule for these defaults.
    pub fn backoff(&self) -> Backoff {
        Backoff::new(
            Duration::from_millis(self.min_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
    }
}
