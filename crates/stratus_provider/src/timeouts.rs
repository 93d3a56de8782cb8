//! Per-resource operation timeouts.

use crate::config::TimeoutOverrides;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20 * 60);

/// How long each lifecycle operation of a resource may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceTimeouts {
    /// Create budget.
    pub create: Duration,
    /// Read budget.
    pub read: Duration,
    /// Update budget.
    pub update: Duration,
    /// Delete budget.
    pub delete: Duration,
}

impl ResourceTimeouts {
    /// Creates timeouts with the 20 minute default for every operation.
    pub const fn new() -> Self {
        Self {
            create: DEFAULT_TIMEOUT,
            read: DEFAULT_TIMEOUT,
            update: DEFAULT_TIMEOUT,
            delete: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the create timeout.
    #[must_use]
    pub const fn with_create(mut self, timeout: Duration) -> Self {
        self.create = timeout;
        self
    }

    /// Sets the read timeout.
    #[must_use]
    pub const fn with_read(mut self, timeout: Duration) -> Self {
        self.read = timeout;
        self
    }

    /// Sets the update timeout.
    #[must_use]
    pub const fn with_update(mut self, timeout: Duration) -> Self {
        self.update = timeout;
        self
    }

    /// Sets the delete timeout.
    #[must_use]
    pub const fn with_delete(mut self, timeout: Duration) -> Self {
        self.delete = timeout;
        self
    }

    /// Replaces each timeout the overrides set.
    #[must_use]
    pub fn apply(mut self, overrides: &TimeoutOverrides) -> Self {
        if let Some(secs) = overrides.create_secs {
            self.create = Duration::from_secs(secs);
        }
        if let Some(secs) = overrides.read_secs {
            self.read = Duration::from_secs(secs);
        }
        if let Some(secs) = overrides.update_secs {
            self.update = Duration::from_secs(secs);
        }
        if let Some(secs) = overrides.delete_secs {
            self.delete = Duration::from_secs(secs);
        }
        self
    }
}

impl Default for ResourceTimeouts {
    fn default() -> Self {
        Self::new()
    }
}
