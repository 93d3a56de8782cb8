//! Waiter state machine.

use crate::cancel::CancelToken;
use crate::clock::{Clock, SystemClock};
use crate::config::StateChangeConf;
use crate::error::{BoxError, WaitError, WaitResult};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Status reported for an object that does not exist.
pub const ABSENT: &str = "";

/// The result of one refresh: the object and its status, or nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation<T> {
    value: Option<T>,
    status: String,
}

impl<T> Observation<T> {
    /// An object that exists with the given status.
    pub fn found(value: T, status: impl Into<String>) -> Self {
        Self {
            value: Some(value),
            status: status.into(),
        }
    }

    /// An object that does not exist (status `""`).
    pub fn absent() -> Self {
        Self {
            value: None,
            status: ABSENT.to_string(),
        }
    }

    /// Returns true if the object does not exist.
    pub fn is_absent(&self) -> bool {
        self.value.is_none()
    }

    /// Gets the observed status.
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Gets the observed object.
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Consumes the observation, returning the object.
    pub fn into_value(self) -> Option<T> {
        self.value
    }
}

/// What the driver should do after an observation.
enum Progress<T> {
    /// The wait succeeded.
    Done(Option<T>),
    /// Still converging; sleep and refresh again.
    Waiting,
}

/// A failed wait together with the last object it observed.
#[derive(Debug)]
pub struct WaitFailure<T> {
    /// Why the wait ended.
    pub error: WaitError,
    /// Most recent object seen before the failure, if any refresh found one.
    pub last_value: Option<T>,
}

impl<T> From<WaitFailure<T>> for WaitError {
    fn from(failure: WaitFailure<T>) -> Self {
        failure.error
    }
}

/// Per-call bookkeeping. Dropped when the wait returns.
struct Machine<'a, T> {
    conf: &'a StateChangeConf<T>,
    last_value: Option<T>,
    refreshes: u32,
    sleeps: u32,
    target_hits: u32,
    not_found_hits: u32,
    last_status: Option<String>,
    last_error: Option<String>,
}

impl<'a, T> Machine<'a, T> {
    fn new(conf: &'a StateChangeConf<T>) -> Self {
        Self {
            conf,
            last_value: None,
            refreshes: 0,
            sleeps: 0,
            target_hits: 0,
            not_found_hits: 0,
            last_status: None,
            last_error: None,
        }
    }

    fn observe(&mut self, observation: Observation<T>) -> WaitResult<Progress<T>> {
        self.refreshes += 1;
        let Observation { value, status } = observation;
        let absent = value.is_none();

        if let (Some(extract), Some(object)) = (&self.conf.status_message, &value) {
            self.last_error = extract(object);
        }
        debug!(refresh = self.refreshes, status = %status, absent, "refreshed");
        self.last_status = Some(status.clone());

        if absent && !self.is_catalogued(&status) {
            self.target_hits = 0;
            if self.not_found_hits < self.conf.not_found_checks {
                self.not_found_hits += 1;
                debug!(
                    checks = self.not_found_hits,
                    limit = self.conf.not_found_checks,
                    "object not found yet"
                );
                return Ok(Progress::Waiting);
            }
            if self.conf.not_found_checks > 0 {
                return Err(WaitError::NotFound {
                    checks: self.conf.not_found_checks,
                });
            }
            return Err(self.unexpected(status));
        }
        self.not_found_hits = 0;

        if self.conf.target.contains(&status) {
            self.target_hits += 1;
            if self.target_hits >= self.conf.continuous_target_occurrence {
                return Ok(Progress::Done(value));
            }
            debug!(
                hits = self.target_hits,
                required = self.conf.continuous_target_occurrence,
                "target reached, awaiting repeat"
            );
            self.remember(value);
            return Ok(Progress::Waiting);
        }

        self.remember(value);
        if self.conf.pending.contains(&status) {
            self.target_hits = 0;
            return Ok(Progress::Waiting);
        }

        Err(self.unexpected(status))
    }

    /// Keeps the latest object that exists; absent observations leave it alone.
    fn remember(&mut self, value: Option<T>) {
        if value.is_some() {
            self.last_value = value;
        }
    }

    fn is_catalogued(&self, status: &str) -> bool {
        self.conf.pending.contains(status) || self.conf.target.contains(status)
    }

    /// Picks the next delay, or times out if it would use up the budget.
    fn next_delay(&mut self, elapsed: Duration) -> WaitResult<Duration> {
        let remaining = self.conf.timeout.saturating_sub(elapsed);
        let delay = self.conf.backoff.delay_for_attempt(self.sleeps);
        if remaining.is_zero() || delay >= remaining {
            return Err(self.timeout_error());
        }
        self.sleeps += 1;
        Ok(delay)
    }

    fn check_budget(&self, elapsed: Duration) -> WaitResult<()> {
        if elapsed >= self.conf.timeout {
            return Err(self.timeout_error());
        }
        Ok(())
    }

    fn unexpected(&self, observed: String) -> WaitError {
        warn!(observed = %observed, "unexpected state");
        WaitError::UnexpectedState {
            observed,
            pending: self.conf.pending.iter().cloned().collect(),
            target: self.conf.target.iter().cloned().collect(),
            last_error: self.last_error.clone(),
        }
    }

    fn timeout_error(&self) -> WaitError {
        warn!(
            timeout = ?self.conf.timeout,
            refreshes = self.refreshes,
            last_status = ?self.last_status,
            "timed out waiting for target state"
        );
        WaitError::Timeout {
            timeout: self.conf.timeout,
            last_status: self.last_status.clone(),
            target: self.conf.target.iter().cloned().collect(),
            last_error: self.last_error.clone(),
        }
    }
}

impl<T> StateChangeConf<T> {
    /// Polls `refresh` until the object reaches a target status.
    ///
    /// Blocks the current thread between refreshes. Returns the object seen
    /// in the target state, or `None` when the target is the absent status.
    pub fn wait<F, E>(&self, cancel: &CancelToken, refresh: F) -> WaitResult<Option<T>>
    where
        F: FnMut() -> Result<Observation<T>, E>,
        E: Into<BoxError>,
    {
        self.wait_with_clock(&SystemClock, cancel, refresh)
    }

    /// Like [`wait`](Self::wait), measuring time and sleeping with `clock`.
    pub fn wait_with_clock<F, E>(
        &self,
        clock: &dyn Clock,
        cancel: &CancelToken,
        refresh: F,
    ) -> WaitResult<Option<T>>
    where
        F: FnMut() -> Result<Observation<T>, E>,
        E: Into<BoxError>,
    {
        self.wait_detailed_with_clock(clock, cancel, refresh).map_err(WaitError::from)
    }

    /// Like [`wait`](Self::wait), handing back the last object observed when
    /// the wait fails.
    pub fn wait_detailed<F, E>(
        &self,
        cancel: &CancelToken,
        refresh: F,
    ) -> Result<Option<T>, WaitFailure<T>>
    where
        F: FnMut() -> Result<Observation<T>, E>,
        E: Into<BoxError>,
    {
        self.wait_detailed_with_clock(&SystemClock, cancel, refresh)
    }

    /// Like [`wait_detailed`](Self::wait_detailed), measuring time and
    /// sleeping with `clock`.
    pub fn wait_detailed_with_clock<F, E>(
        &self,
        clock: &dyn Clock,
        cancel: &CancelToken,
        refresh: F,
    ) -> Result<Option<T>, WaitFailure<T>>
    where
        F: FnMut() -> Result<Observation<T>, E>,
        E: Into<BoxError>,
    {
        let mut machine = Machine::new(self);
        self.poll_blocking(&mut machine, clock, cancel, refresh)
            .map_err(|error| WaitFailure {
                error,
                last_value: machine.last_value.take(),
            })
    }

    fn poll_blocking<F, E>(
        &self,
        machine: &mut Machine<'_, T>,
        clock: &dyn Clock,
        cancel: &CancelToken,
        mut refresh: F,
    ) -> WaitResult<Option<T>>
    where
        F: FnMut() -> Result<Observation<T>, E>,
        E: Into<BoxError>,
    {
        self.validate()?;
        let start = clock.now();

        debug!(
            pending = ?self.pending,
            target = ?self.target,
            timeout = ?self.timeout,
            "waiting for state to become target"
        );

        if !self.initial_delay.is_zero() {
            if self.initial_delay >= self.timeout {
                return Err(machine.timeout_error());
            }
            cancel.check()?;
            clock.sleep(self.initial_delay, cancel)?;
        }

        loop {
            cancel.check()?;
            machine.check_budget(clock.now().saturating_duration_since(start))?;

            let observation = refresh().map_err(WaitError::refresh)?;
            if let Progress::Done(value) = machine.observe(observation)? {
                debug!(refreshes = machine.refreshes, "target state reached");
                return Ok(value);
            }

            let delay = machine.next_delay(clock.now().saturating_duration_since(start))?;
            cancel.check()?;
            debug!(delay = ?delay, "sleeping before next refresh");
            clock.sleep(delay, cancel)?;
        }
    }

    /// Polls an async `refresh` until the object reaches a target status.
    ///
    /// Uses tokio time, so it honours a paused runtime clock.
    pub async fn wait_async<F, Fut, E>(
        &self,
        cancel: &CancelToken,
        refresh: F,
    ) -> WaitResult<Option<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Observation<T>, E>>,
        E: Into<BoxError>,
    {
        self.wait_async_detailed(cancel, refresh)
            .await
            .map_err(WaitError::from)
    }

    /// Like [`wait_async`](Self::wait_async), handing back the last object
    /// observed when the wait fails.
    pub async fn wait_async_detailed<F, Fut, E>(
        &self,
        cancel: &CancelToken,
        refresh: F,
    ) -> Result<Option<T>, WaitFailure<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Observation<T>, E>>,
        E: Into<BoxError>,
    {
        let mut machine = Machine::new(self);
        let outcome = self.poll_async(&mut machine, cancel, refresh).await;
        outcome.map_err(|error| WaitFailure {
            error,
            last_value: machine.last_value.take(),
        })
    }

    async fn poll_async<F, Fut, E>(
        &self,
        machine: &mut Machine<'_, T>,
        cancel: &CancelToken,
        mut refresh: F,
    ) -> WaitResult<Option<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Observation<T>, E>>,
        E: Into<BoxError>,
    {
        self.validate()?;
        let start = tokio::time::Instant::now();

        if !self.initial_delay.is_zero() {
            if self.initial_delay >= self.timeout {
                return Err(machine.timeout_error());
            }
            sleep_or_cancel(self.initial_delay, cancel).await?;
        }

        loop {
            cancel.check()?;
            machine.check_budget(start.elapsed())?;

            let observation = tokio::select! {
                result = refresh() => result.map_err(WaitError::refresh)?,
                _ = cancel.cancelled() => return Err(WaitError::Cancelled),
            };
            if let Progress::Done(value) = machine.observe(observation)? {
                debug!(refreshes = machine.refreshes, "target state reached");
                return Ok(value);
            }

            let delay = machine.next_delay(start.elapsed())?;
            sleep_or_cancel(delay, cancel).await?;
        }
    }
}

async fn sleep_or_cancel(delay: Duration, cancel: &CancelToken) -> WaitResult<()> {
    cancel.check()?;
    tokio::select! {
        _ = tokio::time::sleep(delay) => Ok(()),
        _ = cancel.cancelled() => Err(WaitError::Cancelled),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::Backoff;
    use std::collections::VecDeque;

    fn scripted(statuses: &[&str]) -> impl FnMut() -> Result<Observation<String>, BoxError> {
        let mut queue: VecDeque<String> = statuses.iter().map(|s| s.to_string()).collect();
        move || {
            let status = queue.pop_front().ok_or("script exhausted")?;
            if status.is_empty() {
                Ok(Observation::absent())
            } else {
                Ok(Observation::found(format!("obj:{status}"), status))
            }
        }
    }

    fn domain_conf() -> StateChangeConf<String> {
        StateChangeConf::new(Duration::from_secs(600))
            .with_pending(["Updating"])
            .with_target(["Available"])
            .with_backoff(Backoff::new(Duration::from_secs(1), Duration::from_secs(10)))
    }

    #[test]
    fn observation_accessors() {
        let found = Observation::found(7, "Available");
        assert_eq!(found.status(), "Available");
        assert_eq!(found.value(), Some(&7));
        assert!(!found.is_absent());

        let absent: Observation<u8> = Observation::absent();
        assert!(absent.is_absent());
        assert_eq!(absent.status(), ABSENT);
        assert_eq!(absent.into_value(), None);
    }

    #[test]
    fn immediate_target_never_sleeps() {
        let clock = ManualClock::new();
        let value = domain_conf()
            .wait_with_clock(&clock, &CancelToken::new(), scripted(&["Available"]))
            .unwrap();

        assert_eq!(value.as_deref(), Some("obj:Available"));
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn pending_then_target() {
        let clock = ManualClock::new();
        let value = domain_conf()
            .wait_with_clock(
                &clock,
                &CancelToken::new(),
                scripted(&["Updating", "Updating", "Available"]),
            )
            .unwrap();

        assert_eq!(value.as_deref(), Some("obj:Available"));
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
    }

    #[test]
    fn unlisted_status_is_unexpected() {
        let clock = ManualClock::new();
        let err = domain_conf()
            .wait_with_clock(
                &clock,
                &CancelToken::new(),
                scripted(&["Updating", "Deleted", "Available"]),
            )
            .unwrap_err();

        match err {
            WaitError::UnexpectedState {
                observed, target, ..
            } => {
                assert_eq!(observed, "Deleted");
                assert_eq!(target, vec!["Available".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn refresh_error_is_not_retried() {
        let mut calls = 0;
        let err = domain_conf()
            .wait_with_clock(&ManualClock::new(), &CancelToken::new(), || {
                calls += 1;
                Err::<Observation<String>, _>("throttled")
            })
            .unwrap_err();

        assert!(matches!(err, WaitError::Refresh { .. }));
        assert_eq!(calls, 1);
    }

    #[test]
    fn absent_without_catalogue_is_unexpected() {
        let err = domain_conf()
            .wait_with_clock(&ManualClock::new(), &CancelToken::new(), scripted(&[""]))
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(matches!(err, WaitError::UnexpectedState { .. }));
    }

    #[test]
    fn absent_listed_as_pending_keeps_waiting() {
        let conf = domain_conf().with_pending(["", "Updating"]);
        let value = conf
            .wait_with_clock(
                &ManualClock::new(),
                &CancelToken::new(),
                scripted(&["", "Updating", "Available"]),
            )
            .unwrap();
        assert!(value.is_some());
    }

    #[test]
    fn absent_target_means_deleted() {
        let conf: StateChangeConf<String> = StateChangeConf::new(Duration::from_secs(60))
            .with_pending(["Deleting"])
            .with_target([ABSENT]);
        let value = conf
            .wait_with_clock(
                &ManualClock::new(),
                &CancelToken::new(),
                scripted(&["Deleting", ""]),
            )
            .unwrap();
        assert_eq!(value, None);
    }

    #[test]
    fn not_found_checks_tolerate_eventual_consistency() {
        let conf = domain_conf().with_not_found_checks(2);
        let value = conf
            .wait_with_clock(
                &ManualClock::new(),
                &CancelToken::new(),
                scripted(&["", "", "Available"]),
            )
            .unwrap();
        assert!(value.is_some());

        let err = conf
            .wait_with_clock(
                &ManualClock::new(),
                &CancelToken::new(),
                scripted(&["", "", ""]),
            )
            .unwrap_err();
        assert!(matches!(err, WaitError::NotFound { checks: 2 }));
    }

    #[test]
    fn continuous_target_occurrence_resets_on_pending() {
        let conf = domain_conf().with_continuous_target_occurrence(2);
        let mut calls = 0;
        let mut script = scripted(&["Available", "Updating", "Available", "Available"]);
        let value = conf
            .wait_with_clock(&ManualClock::new(), &CancelToken::new(), || {
                calls += 1;
                script()
            })
            .unwrap();
        assert!(value.is_some());
        assert_eq!(calls, 4);
    }

    #[test]
    fn timeout_instead_of_refresh() {
        let clock = ManualClock::new();
        let conf = domain_conf()
            .with_poll_interval(Duration::from_secs(4))
            .with_status_message(|obj: &String| Some(format!("last seen {obj}")));
        let conf = StateChangeConf {
            timeout: Duration::from_secs(10),
            ..conf
        };
        let mut calls = 0;
        let err = conf
            .wait_with_clock(&clock, &CancelToken::new(), || {
                calls += 1;
                Ok::<_, BoxError>(Observation::found("dn".to_string(), "Updating"))
            })
            .unwrap_err();

        // Refreshes at t=0, 4 and 8; a fourth would need a sleep to t=12.
        assert_eq!(calls, 3);
        assert!(err.is_timeout());
        assert_eq!(err.last_error(), Some("last seen dn"));
        match err {
            WaitError::Timeout { last_status, .. } => {
                assert_eq!(last_status.as_deref(), Some("Updating"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn timeout_hands_back_last_object() {
        let clock = ManualClock::new();
        let conf = StateChangeConf {
            timeout: Duration::from_secs(4),
            ..domain_conf()
        }
        .with_pending(["Updating", "Configuring"])
        .with_not_found_checks(1);
        let failure = conf
            .wait_detailed_with_clock(
                &clock,
                &CancelToken::new(),
                scripted(&["Updating", "Configuring", ""]),
            )
            .unwrap_err();

        // The trailing absent observation does not erase the last object.
        assert!(failure.error.is_timeout());
        assert_eq!(failure.last_value.as_deref(), Some("obj:Configuring"));
        assert_eq!(clock.sleeps().len(), 2);
    }

    #[test]
    fn unexpected_state_hands_back_offending_object() {
        let failure = domain_conf()
            .wait_detailed_with_clock(
                &ManualClock::new(),
                &CancelToken::new(),
                scripted(&["Updating", "Failed"]),
            )
            .unwrap_err();

        assert!(matches!(failure.error, WaitError::UnexpectedState { .. }));
        assert_eq!(failure.last_value.as_deref(), Some("obj:Failed"));

        let failure = domain_conf()
            .with_pending(["Available"])
            .wait_detailed_with_clock(
                &ManualClock::new(),
                &CancelToken::new(),
                scripted(&["Available"]),
            )
            .unwrap_err();
        assert!(matches!(failure.error, WaitError::InvalidConfig(_)));
        assert!(failure.last_value.is_none());
    }

    #[test]
    fn slow_refresh_exhausts_budget() {
        let clock = ManualClock::new();
        let conf = StateChangeConf {
            timeout: Duration::from_secs(5),
            ..domain_conf()
        };
        let err = conf
            .wait_with_clock(&clock, &CancelToken::new(), || {
                clock.advance(Duration::from_secs(6));
                Ok::<_, BoxError>(Observation::found("dn".to_string(), "Updating"))
            })
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn cancelled_before_first_refresh() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut calls = 0;
        let err = domain_conf()
            .wait_with_clock(&ManualClock::new(), &cancel, || {
                calls += 1;
                Ok::<_, BoxError>(Observation::found("dn".to_string(), "Available"))
            })
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(calls, 0);
    }

    #[test]
    fn cancelled_during_refresh_stops_before_sleep() {
        let cancel = CancelToken::new();
        let clock = ManualClock::new();
        let err = domain_conf()
            .wait_with_clock(&clock, &cancel, || {
                cancel.cancel();
                Ok::<_, BoxError>(Observation::found("dn".to_string(), "Updating"))
            })
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn initial_delay_is_slept_first() {
        let clock = ManualClock::new();
        domain_conf()
            .with_initial_delay(Duration::from_secs(3))
            .wait_with_clock(&clock, &CancelToken::new(), scripted(&["Available"]))
            .unwrap();
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(3)]);
    }

    #[test]
    fn invalid_config_makes_no_refresh() {
        let conf = domain_conf().with_pending(["Available"]);
        let mut calls = 0;
        let err = conf
            .wait_with_clock(&ManualClock::new(), &CancelToken::new(), || {
                calls += 1;
                Ok::<_, BoxError>(Observation::found("dn".to_string(), "Available"))
            })
            .unwrap_err();
        assert!(matches!(err, WaitError::InvalidConfig(_)));
        assert_eq!(calls, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn async_pending_then_target() {
        let mut script = scripted(&["Updating", "Updating", "Available"]);
        let start = tokio::time::Instant::now();
        let value = domain_conf()
            .wait_async(&CancelToken::new(), || {
                let next = script();
                async move { next }
            })
            .await
            .unwrap();

        assert_eq!(value.as_deref(), Some("obj:Available"));
        // Slept 1s then 2s.
        assert!(start.elapsed() >= Duration::from_secs(3));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn async_cancel_interrupts_sleep() {
        let cancel = CancelToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            canceller.cancel();
        });

        let start = tokio::time::Instant::now();
        let err = domain_conf()
            .with_poll_interval(Duration::from_secs(60))
            .wait_async(&cancel, || async {
                Ok::<_, BoxError>(Observation::found("dn".to_string(), "Updating"))
            })
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(start.elapsed() < Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn async_timeout() {
        let conf = StateChangeConf {
            timeout: Duration::from_secs(5),
            ..domain_conf()
        };
        let err = conf
            .wait_async(&CancelToken::new(), || async {
                Ok::<_, BoxError>(Observation::found("dn".to_string(), "Updating"))
            })
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn async_timeout_hands_back_last_object() {
        let conf = StateChangeConf {
            timeout: Duration::from_secs(5),
            ..domain_conf()
        };
        let failure = conf
            .wait_async_detailed(&CancelToken::new(), || async {
                Ok::<_, BoxError>(Observation::found("dn".to_string(), "Updating"))
            })
            .await
            .unwrap_err();
        assert!(failure.error.is_timeout());
        assert_eq!(failure.last_value.as_deref(), Some("dn"));
    }
}
