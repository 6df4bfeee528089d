//! Error types for scan orchestration.

use kerb_browser::RenderError;
use kerb_checker::CheckerError;
use kerb_core::{ConfigError, ScanState};
use kerb_crawler::CrawlError;
use kerb_queue::QueueError;
use thiserror::Error;

/// Errors that can occur while orchestrating scans.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The scan configuration was rejected before any work started
    #[error("invalid scan configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// No scan is registered under the given ID
    #[error("scan not found: {scan_id}")]
    ScanNotFound {
        /// The unknown scan ID
        scan_id: String,
    },

    /// The requested operation needs a scan that is still running
    #[error("scan {scan_id} is already {state}")]
    AlreadyTerminal {
        /// The scan in question
        scan_id: String,
        /// The terminal state it reached
        state: ScanState,
    },

    /// The scan ended in `failed`
    #[error("scan {scan_id} failed: {message}")]
    ScanFailed {
        /// The scan in question
        scan_id: String,
        /// The originating cause
        message: String,
    },

    /// The scan was cancelled before it could complete
    #[error("scan {scan_id} was cancelled")]
    ScanCancelled {
        /// The scan in question
        scan_id: String,
    },

    /// The orchestrator has no running worker pool
    #[error("orchestrator is not running")]
    NotRunning,

    /// Page discovery failed
    #[error("crawl failed: {0}")]
    Crawl(#[from] CrawlError),

    /// The job queue rejected an operation
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    /// A page could not be rendered
    #[error("render failed: {0}")]
    Render(#[from] RenderError),

    /// A checker could not be resolved or run
    #[error("checker failed: {0}")]
    Checker(#[from] CheckerError),
}

/// Result type for orchestration operations.
pub type Result<T> = std::result::Result<T, ScanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ScanError::AlreadyTerminal {
            scan_id: "8e2c9d1f".to_string(),
            state: ScanState::Completed,
        };
        assert_eq!(err.to_string(), "scan 8e2c9d1f is already completed");

        let err = ScanError::ScanFailed {
            scan_id: "8e2c9d1f".to_string(),
            message: "crawl aborted".to_string(),
        };
        assert_eq!(err.to_string(), "scan 8e2c9d1f failed: crawl aborted");
    }

    #[test]
    fn test_wraps_subsystem_errors() {
        let queue_err = QueueError::Full { capacity: 100 };
        let err: ScanError = queue_err.into();
        assert!(matches!(err, ScanError::Queue(QueueError::Full { capacity: 100 })));

        let crawl_err = CrawlError::Aborted {
            attempted: 10,
            failed: 6,
            threshold: 0.5,
        };
        let err: ScanError = crawl_err.into();
        assert!(err.to_string().starts_with("crawl failed:"));
    }
}
