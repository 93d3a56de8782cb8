//! # Stratus Wait
//!
//! State-change waiter for asynchronous cloud operations.
//!
//! This crate provides:
//! - A status poller (pending → target) driven by a caller-supplied refresh function
//! - Exponential backoff bounded by a per-call timeout
//! - Eventual-consistency tolerance for objects that are not visible yet
//! - Interruptible sleeps through a shared cancellation token
//! - Blocking and tokio-driven variants over the same state machine
//!
//! ## Model
//!
//! A resource lifecycle handler issues a mutating call, then hands a refresh
//! closure to [`StateChangeConf::wait`]. Every refresh yields an
//! [`Observation`]: either the object together with its status string, or an
//! absent marker meaning the object does not exist (status `""`).
//!
//! ## Key Invariants
//!
//! - Pending and target status sets never overlap
//! - Refresh errors are returned immediately and never retried here
//! - An uncatalogued status ends the wait without another refresh
//! - No sleep extends past the remaining timeout budget
//! - The waiter keeps no state between calls

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cancel;
mod clock;
mod config;
mod error;
mod state;

pub use cancel::CancelToken;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Backoff, StateChangeConf, StatusMessageFn};
pub use error::{BoxError, WaitError, WaitResult};
pub use state::{Observation, WaitFailure, ABSENT};
