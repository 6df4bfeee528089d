//! Error types for the checker subsystem.

use thiserror::Error;

/// Errors that can occur when resolving or running checkers.
#[derive(Error, Debug)]
pub enum CheckerError {
    /// No checker is registered under the requested name
    #[error("unknown checker: {name}")]
    Unknown {
        /// The checker name that could not be resolved
        name: String,
    },

    /// The checker exists but cannot run (e.g. its external tool is missing)
    #[error("checker {checker} unavailable: {reason}")]
    Unavailable {
        /// Name of the checker
        checker: String,
        /// Why it cannot run
        reason: String,
    },

    /// The checker ran and reported an error
    #[error("checker {checker} failed: {reason}")]
    Failed {
        /// Name of the checker
        checker: String,
        /// Failure detail (exit status, stderr excerpt)
        reason: String,
    },

    /// The checker exceeded its time budget
    #[error("checker {checker} timed out after {timeout_secs}s")]
    Timeout {
        /// Name of the checker
        checker: String,
        /// Budget that was exceeded
        timeout_secs: u64,
    },

    /// The checker produced output this adapter could not parse
    #[error("checker {checker} produced invalid output: {reason}")]
    InvalidOutput {
        /// Name of the checker
        checker: String,
        /// Parse failure detail
        reason: String,
    },

    /// I/O error while driving the checker process
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CheckerError {
    /// Whether the failure means the checker can never succeed as configured.
    ///
    /// Unavailable and unknown checkers stay broken across retries; a run
    /// failure or timeout may be transient.
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Unknown { .. } | Self::Unavailable { .. })
    }
}

/// Result type for checker operations.
pub type Result<T> = std::result::Result<T, CheckerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CheckerError::Unavailable {
            checker: "axe".to_string(),
            reason: "axe-cli not found on PATH".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "checker axe unavailable: axe-cli not found on PATH"
        );
    }

    #[test]
    fn test_permanence_classification() {
        let unavailable = CheckerError::Unavailable {
            checker: "axe".to_string(),
            reason: "missing".to_string(),
        };
        assert!(unavailable.is_permanent());

        let timeout = CheckerError::Timeout {
            checker: "axe".to_string(),
            timeout_secs: 30,
        };
        assert!(!timeout.is_permanent());
    }
}
