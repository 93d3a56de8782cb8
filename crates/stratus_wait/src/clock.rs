//! Time source abstraction for the blocking waiter.

use crate::cancel::CancelToken;
use crate::error::WaitResult;
use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// A clock measures elapsed time and performs cancellable sleeps.
///
/// This trait abstracts wall-clock time, allowing the waiter to run against
/// real time in production and virtual time in tests.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> Instant;

    /// Sleeps for `duration`, returning early with `WaitError::Cancelled`
    /// if `cancel` fires.
    fn sleep(&self, duration: Duration, cancel: &CancelToken) -> WaitResult<()>;
}

/// The real system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration, cancel: &CancelToken) -> WaitResult<()> {
        cancel.sleep(duration)
    }
}

/// Furthest a [`ManualClock`] moves past its origin.
const MANUAL_HORIZON: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// A virtual clock for testing.
///
/// Sleeping advances virtual time instantly and records the requested
/// duration. Refresh functions can call [`advance`](ManualClock::advance) to
/// simulate slow API calls. Virtual time stops at a horizon one century past
/// creation.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    state: Mutex<ManualState>,
}

#[derive(Debug, Default)]
struct ManualState {
    offset: Duration,
    sleeps: Vec<Duration>,
}

impl ManualClock {
    /// Creates a new manual clock starting at the current instant.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            state: Mutex::new(ManualState::default()),
        }
    }

    /// Moves virtual time forward without recording a sleep.
    pub fn advance(&self, duration: Duration) {
        let mut state = self.state.lock();
        state.offset = state.offset.saturating_add(duration).min(MANUAL_HORIZON);
    }

    /// Returns the virtual time elapsed since creation.
    pub fn elapsed(&self) -> Duration {
        self.state.lock().offset
    }

    /// Returns every sleep performed so far, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.state.lock().sleeps.clone()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = self.state.lock().offset;
        self.origin.checked_add(offset).unwrap_or(self.origin)
    }

    fn sleep(&self, duration: Duration, cancel: &CancelToken) -> WaitResult<()> {
        cancel.check()?;
        let mut state = self.state.lock();
        state.offset = state.offset.saturating_add(duration).min(MANUAL_HORIZON);
        state.sleeps.push(duration);
        Ok(())
    }
}
