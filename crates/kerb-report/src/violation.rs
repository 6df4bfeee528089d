//! The deduplicated violation model.

use kerb_core::{ConformanceLevel, Principle, Severity};
use serde::{Deserialize, Serialize};

/// One aggregated accessibility issue.
///
/// A violation is unique per (rule, page, normalized selector). Checkers that
/// report the same issue merge into a single violation with every checker
/// recorded in [`detected_by`](Self::detected_by).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    /// Rule identifier as first reported (e.g. `image-alt`)
    pub rule: String,

    /// Human-readable description, first-seen wins
    pub description: String,

    /// Highest severity any checker assigned to this issue
    pub severity: Severity,

    /// Conformance level the rule is scored at
    pub level: ConformanceLevel,

    /// Principle bucket for per-category scoring
    pub principle: Principle,

    /// URL of the page the violation was found on
    pub page_url: String,

    /// Normalized selector that keys this violation
    pub selector: String,

    /// Raw selectors as reported, deduplicated in first-seen order
    pub occurrences: Vec<String>,

    /// Names of the checkers that reported this issue, sorted
    pub detected_by: Vec<String>,

    /// Link to remediation guidance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_url: Option<String>,

    /// WCAG success criteria the rule maps to
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub wcag_criteria: Vec<String>,
}

impl Violation {
    /// Number of distinct raw occurrences merged into this violation.
    #[must_use]
    pub fn occurrence_count(&self) -> usize {
        self.occurrences.len()
    }
}
