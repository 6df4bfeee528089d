//! Kerb Report - Result aggregation and compliance scoring.
//!
//! This crate turns the raw per-page output of a scan into the report the
//! caller sees: checker findings are merged into deduplicated [`Violation`]s,
//! violations are weighed into a [`ComplianceScore`], and everything is
//! assembled into the final [`ScanResult`].
//!
//! # Modules
//!
//! - [`page`] - Per-page scan output ([`PageResult`], [`CheckerRun`])
//! - [`violation`] - The deduplicated [`Violation`] model
//! - [`mod@aggregate`] - Finding-to-violation merge
//! - [`catalog`] - Static WCAG success-criterion reference data
//! - [`score`] - Weighted compliance scoring and banding
//! - [`result`] - Final [`ScanResult`] and [`ScanSummary`]
//!
//! # Example
//!
//! ```rust
//! use kerb_checker::Finding;
//! use kerb_core::Severity;
//! use kerb_report::{aggregate, CheckerRun, ComplianceScorer, PageResult};
//!
//! let finding = Finding::new("image-alt", "Missing alt text", Severity::Critical, "img#hero", "axe");
//! let run = CheckerRun::succeeded("axe", vec![finding], 120);
//! let page = PageResult::scanned("https://example.org/", None, Some(200), 640, vec![run]);
//!
//! let violations = aggregate(std::slice::from_ref(&page));
//! let score = ComplianceScorer::new().score(&violations, 1);
//! assert!(score.overall < 100.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod aggregate;
pub mod catalog;
pub mod page;
pub mod result;
pub mod score;
pub mod violation;

// Re-export commonly used types
pub use aggregate::{aggregate, normalize_rule_id, selector_signature};
pub use catalog::{criterion, principle_of, resolve_meta, Criterion, RuleMeta};
pub use page::{CheckerRun, PageResult};
pub use result::{ScanResult, ScanSummary, SeverityCounts};
pub use score::{ComplianceBand, ComplianceScore, ComplianceScorer, ScoreWeights};
pub use violation::Violation;
