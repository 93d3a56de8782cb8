//! Configuration for state-change waits.

use crate::error::{WaitError, WaitResult};
use rand::Rng;
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

/// Extracts a human-readable error detail from an observed object.
pub type StatusMessageFn<T> = Box<dyn Fn(&T) -> Option<String> + Send + Sync>;

/// Delay schedule between refreshes.
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    /// Delay after the first pending observation.
    pub min_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Growth factor applied per pending observation.
    pub multiplier: f64,
    /// Whether to add up to 25% random jitter (still capped at `max_delay`).
    pub jitter: bool,
}

impl Backoff {
    /// Creates an exponential schedule doubling from `min_delay` up to `max_delay`.
    pub fn new(min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            min_delay,
            max_delay,
            multiplier: 2.0,
            jitter: false,
        }
    }

    /// Creates a schedule that always waits `interval`.
    pub fn fixed(interval: Duration) -> Self {
        Self {
            min_delay: interval,
            max_delay: interval,
            multiplier: 1.0,
            jitter: false,
        }
    }

    /// Sets the growth factor.
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Enables or disables jitter.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Calculates the delay after the given pending observation (0-indexed).
    ///
    /// Without jitter the sequence is non-decreasing and never exceeds
    /// `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if self.min_delay.is_zero() {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let max_secs = self.max_delay.as_secs_f64();
        let base = self.min_delay.as_secs_f64() * self.multiplier.powi(exponent);
        let mut delay_secs = base.min(max_secs);

        if self.jitter {
            let factor: f64 = rand::thread_rng().gen_range(0.0..=0.25);
            delay_secs = (delay_secs + delay_secs * factor).min(max_secs);
        }

        // Float rounding can push a delay near `Duration::MAX` out of range.
        Duration::try_from_secs_f64(delay_secs)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    fn validate(&self) -> WaitResult<()> {
        if self.min_delay > self.max_delay {
            return Err(WaitError::InvalidConfig(format!(
                "min delay {:?} exceeds max delay {:?}",
                self.min_delay, self.max_delay
            )));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(WaitError::InvalidConfig(format!(
                "backoff multiplier must be finite and at least 1.0, got {}",
                self.multiplier
            )));
        }
        Ok(())
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(100), Duration::from_secs(10))
    }
}

/// Describes one wait for an object to move from pending to target states.
///
/// `T` is the type of object produced by the refresh function.
pub struct StateChangeConf<T> {
    pub(crate) pending: BTreeSet<String>,
    pub(crate) target: BTreeSet<String>,
    pub(crate) timeout: Duration,
    pub(crate) backoff: Backoff,
    pub(crate) initial_delay: Duration,
    pub(crate) not_found_checks: u32,
    pub(crate) continuous_target_occurrence: u32,
    pub(crate) status_message: Option<StatusMessageFn<T>>,
}

impl<T> StateChangeConf<T> {
    /// Creates a wait with the given overall timeout and no statuses.
    pub fn new(timeout: Duration) -> Self {
        Self {
            pending: BTreeSet::new(),
            target: BTreeSet::new(),
            timeout,
            backoff: Backoff::default(),
            initial_delay: Duration::ZERO,
            not_found_checks: 0,
            continuous_target_occurrence: 1,
            status_message: None,
        }
    }

    /// Sets the statuses that mean "still converging".
    pub fn with_pending<I, S>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pending = statuses.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the statuses that mean "done".
    pub fn with_target<I, S>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target = statuses.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the backoff schedule.
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Sets the minimum and maximum delay between refreshes.
    pub fn with_delays(mut self, min_delay: Duration, max_delay: Duration) -> Self {
        self.backoff.min_delay = min_delay;
        self.backoff.max_delay = max_delay;
        self
    }

    /// Polls at a fixed interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.backoff = Backoff::fixed(interval);
        self
    }

    /// Sets a delay before the first refresh.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Tolerates up to `checks` consecutive absent observations.
    ///
    /// Absent observations are otherwise treated as an unexpected state unless
    /// `""` is listed as pending or target.
    pub fn with_not_found_checks(mut self, checks: u32) -> Self {
        self.not_found_checks = checks;
        self
    }

    /// Requires the target status to be observed `occurrences` times in a row.
    pub fn with_continuous_target_occurrence(mut self, occurrences: u32) -> Self {
        self.continuous_target_occurrence = occurrences.max(1);
        self
    }

    /// Sets an extractor for the last error detail attached to failures.
    pub fn with_status_message<F>(mut self, extract: F) -> Self
    where
        F: Fn(&T) -> Option<String> + Send + Sync + 'static,
    {
        self.status_message = Some(Box::new(extract));
        self
    }

    /// Gets the pending statuses.
    pub fn pending(&self) -> &BTreeSet<String> {
        &self.pending
    }

    /// Gets the target statuses.
    pub fn target(&self) -> &BTreeSet<String> {
        &self.target
    }

    /// Gets the overall timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Gets the backoff schedule.
    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Checks the configuration before any refresh is made.
    pub fn validate(&self) -> WaitResult<()> {
        if self.target.is_empty() {
            return Err(WaitError::InvalidConfig("target status set is empty".into()));
        }
        if let Some(status) = self.pending.intersection(&self.target).next() {
            return Err(WaitError::InvalidConfig(format!(
                "status '{status}' is both pending and target"
            )));
        }
        self.backoff.validate()
    }
}

impl<T> fmt::Debug for StateChangeConf<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateChangeConf")
            .field("pending", &self.pending)
            .field("target", &self.target)
            .field("timeout", &self.timeout)
            .field("backoff", &self.backoff)
            .field("initial_delay", &self.initial_delay)
            .field("not_found_checks", &self.not_found_checks)
            .field(
                "continuous_target_occurrence",
                &self.continuous_target_occurrence,
            )
            .field("status_message", &self.status_message.is_some())
            .finish()
    }
}
