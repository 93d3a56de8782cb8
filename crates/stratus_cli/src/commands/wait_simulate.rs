//! Wait simulate command implementation.

use serde::Serialize;
use std::time::Duration;
use stratus_wait::{
    Backoff, CancelToken, Clock, Observation, StateChangeConf, SystemClock, WaitError,
};

/// Marker for an absent object in a scripted status sequence.
pub const ABSENT_MARKER: &str = "-";

/// Waiter settings for a simulation.
#[derive(Debug, Clone)]
pub struct Options {
    /// Pending statuses.
    pub pending: Vec<String>,
    /// Target statuses.
    pub target: Vec<String>,
    /// Overall timeout in milliseconds.
    pub timeout_ms: u64,
    /// First delay in milliseconds.
    pub min_delay_ms: u64,
    /// Maximum delay in milliseconds.
    pub max_delay_ms: u64,
    /// Consecutive absent observations tolerated.
    pub not_found_checks: u32,
    /// Consecutive target observations required.
    pub occurrences: u32,
}

/// Outcome of a simulation.
#[derive(Debug, Serialize)]
pub struct SimulationResult {
    /// `reached` or the kind of failure.
    pub outcome: &'static str,
    /// Number of refreshes performed.
    pub refreshes: usize,
    /// Status of the object returned on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Error message on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Runs the wait simulate command.
pub fn run(statuses: &[String], options: &Options) -> Result<(), Box<dyn std::error::Error>> {
    let result = simulate(statuses, options, &SystemClock, &CancelToken::new())?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    if result.error.is_some() {
        return Err(format!("wait did not reach {}", options.target.join(",")).into());
    }
    Ok(())
}

/// Polls `statuses` in order; the last status repeats once the script runs out.
pub fn simulate(
    statuses: &[String],
    options: &Options,
    clock: &dyn Clock,
    cancel: &CancelToken,
) -> Result<SimulationResult, WaitError> {
    let backoff = Backoff::new(
        Duration::from_millis(options.min_delay_ms),
        Duration::from_millis(options.max_delay_ms),
    );
    let conf = StateChangeConf::<String>::new(Duration::from_millis(options.timeout_ms))
        .with_pending(options.pending.iter().map(|status| absent_alias(status)))
        .with_target(options.target.iter().map(|status| absent_alias(status)))
        .with_backoff(backoff)
        .with_not_found_checks(options.not_found_checks)
        .with_continuous_target_occurrence(options.occurrences);
    // Configuration mistakes are the caller's, not part of the simulated outcome.
    conf.validate()?;

    let mut refreshes = 0usize;
    let outcome = conf.wait_with_clock(clock, cancel, || {
        let status = statuses
            .get(refreshes)
            .or_else(|| statuses.last())
            .map(String::as_str)
            .unwrap_or(ABSENT_MARKER);
        refreshes += 1;
        let observation = if status == ABSENT_MARKER {
            Observation::absent()
        } else {
            Observation::found(status.to_string(), status)
        };
        Ok::<_, WaitError>(observation)
    });

    Ok(match outcome {
        Ok(status) => SimulationResult {
            outcome: "reached",
            refreshes,
            status,
            error: None,
        },
        Err(err) => SimulationResult {
            outcome: failure_kind(&err),
            refreshes,
            status: None,
            error: Some(err.to_string()),
        },
    })
}

fn absent_alias(status: &str) -> String {
    if status == ABSENT_MARKER {
        String::new()
    } else {
        status.to_string()
    }
}

fn failure_kind(err: &WaitError) -> &'static str {
    match err {
        WaitError::Timeout { .. } => "timeout",
        WaitError::UnexpectedState { .. } => "unexpected_state",
        WaitError::NotFound { .. } => "not_found",
        WaitError::Cancelled => "cancelled",
        WaitError::Refresh { .. } => "refresh_error",
        WaitError::InvalidConfig(_) => "invalid_config",
    }
}
