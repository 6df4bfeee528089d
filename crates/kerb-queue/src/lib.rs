//! Job queue and worker pool for scan execution.
//!
//! Scans are decomposed into jobs: one site orchestration job per scan
//! request plus one page scan job per discovered URL. Jobs flow through a
//! priority queue ([`JobQueue`]) and are drained by a pool of worker tasks
//! ([`WorkerPool`]) that execute them through the [`JobExecutor`] seam.
//!
//! The queue dispatches by priority, then first-in-first-out within equal
//! priority. Failed jobs retry with exponential backoff up to a per-job
//! attempt limit; a full queue rejects new work so callers can apply
//! backpressure instead of dropping jobs silently.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod error;
pub mod job;
pub mod pool;
pub mod queue;

pub use error::{QueueError, Result};
pub use job::{JobFailure, JobKind, JobPayload, JobPriority, JobStatus, ScanJob};
pub use pool::{JobExecutor, PoolHealth, PoolStatus, WorkerPool};
pub use queue::{JobQueue, QueueStats, RetryDecision};
