//! Kerb Checker - unified checker interface and adapters.
//!
//! Accessibility checkers are heterogeneous: some run in-process, others
//! shell out to external tools. This crate hides that behind one seam so
//! the worker pool and orchestrator stay checker-agnostic.
//!
//! # Architecture
//!
//! - **Finding** ([`finding`]): the raw issue model every checker produces
//! - **Checker trait** ([`checker`]): the single `run` capability
//! - **Registry** ([`registry`]): name-to-adapter resolution
//! - **Command adapter** ([`command`]): subprocess invocation for external tools
//! - **Errors** ([`error`]): checker-specific error types
//!
//! # Example
//!
//! ```rust
//! use kerb_checker::{CheckerRegistry, CommandChecker};
//! use std::sync::Arc;
//!
//! let registry = CheckerRegistry::new();
//! registry.register(Arc::new(CommandChecker::new(
//!     "axe",
//!     "axe-cli",
//!     vec!["--stdout".to_string(), "{url}".to_string()],
//! )));
//!
//! assert!(registry.contains("axe"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod checker;
pub mod command;
pub mod error;
pub mod finding;
pub mod registry;

// Re-export commonly used types
pub use checker::Checker;
pub use command::{CommandChecker, HTML_PLACEHOLDER, URL_PLACEHOLDER};
pub use error::{CheckerError, Result};
pub use finding::Finding;
pub use registry::CheckerRegistry;
