//! Raw finding model shared by all checkers.

use kerb_core::{ConformanceLevel, Severity};
use serde::{Deserialize, Serialize};

/// A single raw issue instance reported by one checker on one page.
///
/// Findings are created once and never mutated; the aggregation stage in
/// `kerb-report` merges them into deduplicated violations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    /// Rule identifier as the checker reported it (e.g. `image-alt`)
    pub rule: String,

    /// Human-readable description of the issue
    pub description: String,

    /// Impact tier assigned by the checker
    pub impact: Severity,

    /// Locator for the offending element, usually a CSS selector
    pub selector: String,

    /// Name of the checker that produced this finding
    pub checker: String,

    /// Supporting data: an HTML snippet or measured values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    /// Link to remediation guidance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_url: Option<String>,

    /// WCAG success criteria this rule maps to (e.g. `1.1.1`)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub wcag_criteria: Vec<String>,

    /// Conformance level, when the checker reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<ConformanceLevel>,
}

impl Finding {
    /// Create a finding with the required fields and no optional metadata.
    #[must_use]
    pub fn new(
        rule: impl Into<String>,
        description: impl Into<String>,
        impact: Severity,
        selector: impl Into<String>,
        checker: impl Into<String>,
    ) -> Self {
        Self {
            rule: rule.into(),
            description: description.into(),
            impact,
            selector: selector.into(),
            checker: checker.into(),
            context: None,
            help_url: None,
            wcag_criteria: Vec::new(),
            level: None,
        }
    }

    /// Attach a supporting HTML snippet.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Attach a remediation link.
    #[must_use]
    pub fn with_help_url(mut self, help_url: impl Into<String>) -> Self {
        self.help_url = Some(help_url.into());
        self
    }
}
