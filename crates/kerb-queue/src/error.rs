//! Error types for the queue subsystem.

use thiserror::Error;

/// Errors that can occur in queue and pool operations.
#[derive(Error, Debug)]
pub enum QueueError {
    /// The queue is at capacity; the caller must retry later or reduce scope
    #[error("queue is full ({capacity} pending jobs)")]
    Full {
        /// The configured capacity that was hit
        capacity: usize,
    },

    /// No job exists under the given ID
    #[error("job not found: {job_id}")]
    NotFound {
        /// The unknown job ID
        job_id: String,
    },

    /// The requested transition is not legal from the job's current status
    #[error("job {job_id} is {status}, cannot {action}")]
    InvalidTransition {
        /// The job in question
        job_id: String,
        /// Its current status
        status: String,
        /// The transition that was attempted
        action: String,
    },

    /// `start` called on a pool that is already running
    #[error("worker pool is already running")]
    PoolAlreadyRunning,

    /// A pool operation that needs a running pool was called on a stopped one
    #[error("worker pool is not running")]
    PoolNotRunning,
}

/// Result type for queue operations.
pub type Result<T> = std::result::Result<T, QueueError>;
