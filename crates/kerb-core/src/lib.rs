//! Kerb Core - Foundation crate for the Kerb accessibility scanner.
//!
//! This crate provides the shared types, error handling, and configuration
//! management that all other Kerb crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`scan`] - Per-scan configuration ([`ScanConfig`]) and the [`Site`] model
//! - [`types`] - Shared newtypes and enums (`ScanId`, `JobId`, `Severity`, ...)
//!
//! # Example
//!
//! ```rust
//! use kerb_core::{ScanConfig, Site, SiteId};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let site = Site::new(SiteId::new("city-portal")?, "https://portal.example.gov");
//!
//! // Reject nonsense before any work is queued
//! site.config.validate()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod scan;
pub mod types;

// Re-export commonly used types
pub use config::{AppConfig, BrowserConfig, QueueConfig, ScoreConfig};
pub use error::{ConfigError, ConfigResult, KerbError, Result};
pub use scan::{ScanConfig, Site};
pub use types::{
    ConformanceLevel, JobId, Principle, ScanId, ScanState, Severity, SiteId, WorkerId,
};
