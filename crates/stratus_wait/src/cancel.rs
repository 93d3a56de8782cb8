//! Cancellation token shared between a caller and its waits.

use crate::error::{WaitError, WaitResult};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// A cloneable cancellation token.
///
/// Cancelling any clone wakes every blocking [`sleep`](CancelToken::sleep) and
/// every async [`cancelled`](CancelToken::cancelled) future waiting on it.
/// Cancellation is permanent.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    token: CancellationToken,
    sleepers: Arc<Sleepers>,
}

/// Wakes threads parked in a blocking sleep.
#[derive(Debug, Default)]
struct Sleepers {
    lock: Mutex<()>,
    condvar: Condvar,
}

impl CancelToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the token and wakes all waiters.
    pub fn cancel(&self) {
        if self.token.is_cancelled() {
            return;
        }
        self.token.cancel();
        // Notify under the lock so a sleeper between its check and its wait
        // cannot miss the wakeup.
        let _guard = self.sleepers.lock.lock();
        self.sleepers.condvar.notify_all();
        tracing::debug!("cancellation requested");
    }

    /// Returns true once the token has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Returns `Err(WaitError::Cancelled)` if the token has been cancelled.
    pub fn check(&self) -> WaitResult<()> {
        if self.is_cancelled() {
            Err(WaitError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Blocks the current thread for `duration` or until cancelled.
    ///
    /// A duration too large to represent as a deadline waits for
    /// cancellation only.
    pub fn sleep(&self, duration: Duration) -> WaitResult<()> {
        let deadline = Instant::now().checked_add(duration);
        let mut guard = self.sleepers.lock.lock();
        while !self.token.is_cancelled() {
            match deadline {
                Some(deadline) => {
                    if self
                        .sleepers
                        .condvar
                        .wait_until(&mut guard, deadline)
                        .timed_out()
                    {
                        break;
                    }
                }
                None => self.sleepers.condvar.wait(&mut guard),
            }
        }
        drop(guard);
        self.check()
    }

    /// Completes once the token has been cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// Gets the underlying token for use with tokio-aware APIs.
    pub fn as_cancellation_token(&self) -> &CancellationToken {
        &self.token
    }
}
