//! Kerb Scanner - scan orchestration.
//!
//! This crate ties the rest of Kerb together: it accepts scan requests,
//! crawls the target site, fans page audits out over the worker pool, and
//! aggregates the findings into a scored report. Callers interact with one
//! type, [`ScanOrchestrator`]; everything else is plumbing behind it.
//!
//! # Features
//!
//! - Concurrent page scanning with a configurable worker pool
//! - Priority scheduling: new site scans preempt queued page work
//! - Per-page retry with exponential backoff for transient render failures
//! - Live progress reporting through a pluggable [`ProgressHandler`]
//! - Cooperative cancellation that settles cleanly mid-scan
//!
//! # Example
//!
//! ```rust,ignore
//! use kerb_browser::StaticRenderer;
//! use kerb_checker::CheckerRegistry;
//! use kerb_core::{BrowserConfig, QueueConfig, ScanConfig, SiteId};
//! use kerb_scanner::{ScanOrchestrator, ScanRegistry};
//! use std::sync::Arc;
//!
//! let renderer = Arc::new(StaticRenderer::new(&BrowserConfig::default())?);
//! let orchestrator = ScanOrchestrator::new(
//!     renderer,
//!     CheckerRegistry::new(),
//!     Arc::new(ScanRegistry::new()),
//!     QueueConfig::default(),
//! );
//! orchestrator.start(4)?;
//!
//! let scan_id = orchestrator
//!     .start_scan(SiteId::new("example-org")?, "https://example.org/", ScanConfig::default())
//!     .await?;
//! let result = orchestrator.wait_for_result(&scan_id).await?;
//! println!("score: {:.1} ({:?})", result.score.overall, result.score.band);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod error;
pub mod executor;
pub mod orchestrator;
pub mod page_scanner;
pub mod progress;
pub mod registry;

// Re-export commonly used types
pub use error::{Result, ScanError};
pub use executor::ScanJobExecutor;
pub use orchestrator::ScanOrchestrator;
pub use page_scanner::PageScanner;
pub use progress::{from_fn, NullProgress, ProgressEvent, ProgressHandler};
pub use registry::{ScanHandle, ScanRegistry, ScanSnapshot};
