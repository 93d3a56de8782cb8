//! Error types for the waiter.

use std::time::Duration;
use thiserror::Error;

/// Boxed error returned by refresh functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for wait operations.
pub type WaitResult<T> = Result<T, WaitError>;

/// Errors that can end a wait.
#[derive(Error, Debug)]
pub enum WaitError {
    /// The refresh function itself failed.
    #[error("refresh failed: {source}")]
    Refresh {
        /// Error returned by the refresh function.
        #[source]
        source: BoxError,
    },

    /// The object reported a status outside both the pending and target sets.
    #[error(
        "unexpected state '{observed}', wanted target '{}'{}",
        .target.join(", "),
        detail(.last_error)
    )]
    UnexpectedState {
        /// Status that was observed.
        observed: String,
        /// Statuses that mean "still converging".
        pending: Vec<String>,
        /// Statuses that mean "done".
        target: Vec<String>,
        /// Last error detail reported by the remote object, if any.
        last_error: Option<String>,
    },

    /// The timeout budget ran out while the object was still converging.
    #[error(
        "timeout while waiting for state to become '{}' (last state: '{}', timeout: {timeout:?}){}",
        .target.join(", "),
        .last_status.as_deref().unwrap_or(""),
        detail(.last_error)
    )]
    Timeout {
        /// Total budget that was exhausted.
        timeout: Duration,
        /// Last status observed before the budget ran out.
        last_status: Option<String>,
        /// Statuses that mean "done".
        target: Vec<String>,
        /// Last error detail reported by the remote object, if any.
        last_error: Option<String>,
    },

    /// The object stayed absent for longer than the tolerated number of checks.
    #[error("couldn't find resource ({checks} retries)")]
    NotFound {
        /// Number of consecutive absent observations tolerated.
        checks: u32,
    },

    /// The caller cancelled the wait.
    #[error("wait cancelled")]
    Cancelled,

    /// The waiter was configured inconsistently.
    #[error("invalid wait configuration: {0}")]
    InvalidConfig(String),
}

fn detail(last_error: &Option<String>) -> String {
    match last_error {
        Some(message) if !message.is_empty() => format!(": {message}"),
        _ => String::new(),
    }
}

impl WaitError {
    /// Creates a refresh error from any error type.
    pub fn refresh(source: impl Into<BoxError>) -> Self {
        Self::Refresh {
            source: source.into(),
        }
    }

    /// Returns true if the timeout budget was exhausted.
    pub fn is_timeout(&self) -> bool {
        matches!(self, WaitError::Timeout { .. })
    }

    /// Returns true if the wait ended because the object does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            WaitError::NotFound { .. } => true,
            WaitError::UnexpectedState { observed, .. } => observed.is_empty(),
            _ => false,
        }
    }

    /// Returns true if the caller cancelled the wait.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, WaitError::Cancelled)
    }

    /// Returns the last error detail attached to this error.
    pub fn last_error(&self) -> Option<&str> {
        match self {
            WaitError::UnexpectedState { last_error, .. } | WaitError::Timeout { last_error, .. } => {
                last_error.as_deref()
            }
            _ => None,
        }
    }

    /// Attaches an error detail to a timeout or unexpected-state error.
    ///
    /// Other kinds are left untouched. Empty messages are ignored.
    pub fn set_last_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        if message.is_empty() {
            return;
        }
        if let WaitError::UnexpectedState { last_error, .. } | WaitError::Timeout { last_error, .. } =
            self
        {
            *last_error = Some(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = WaitError::UnexpectedState {
            observed: "Deleted".into(),
            pending: vec!["Updating".into()],
            target: vec!["Available".into()],
            last_error: None,
        };
        assert_eq!(
            err.to_string(),
            "unexpected state 'Deleted', wanted target 'Available'"
        );

        let err = WaitError::Timeout {
            timeout: Duration::from_secs(600),
            last_status: Some("Updating".into()),
            target: vec!["Available".into()],
            last_error: Some("certificate pending validation".into()),
        };
        let text = err.to_string();
        assert!(text.contains("last state: 'Updating'"));
        assert!(text.ends_with(": certificate pending validation"));
    }

    #[test]
    fn set_last_error_only_touches_state_errors() {
        let mut err = WaitError::Timeout {
            timeout: Duration::from_secs(1),
            last_status: None,
            target: vec![],
            last_error: None,
        };
        err.set_last_error("boom");
        assert_eq!(err.last_error(), Some("boom"));

        err.set_last_error("");
        assert_eq!(err.last_error(), Some("boom"));

        let mut err = WaitError::Cancelled;
        err.set_last_error("ignored");
        assert_eq!(err.last_error(), None);
    }

    #[test]
    fn classification() {
        assert!(WaitError::NotFound { checks: 3 }.is_not_found());
        assert!(WaitError::UnexpectedState {
            observed: String::new(),
            pending: vec![],
            target: vec!["Available".into()],
            last_error: None,
        }
        .is_not_found());
        assert!(WaitError::Cancelled.is_cancelled());
        assert!(!WaitError::refresh("api down").is_timeout());
    }
}
