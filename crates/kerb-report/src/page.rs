//! Per-page scan output.
//!
//! Every page a scan touches produces exactly one [`PageResult`], whether the
//! render succeeded or not. Failed pages carry an error marker and an empty
//! checker-run list so the final report can distinguish "scanned clean" from
//! "never loaded".

use chrono::{DateTime, Utc};
use kerb_checker::Finding;
use serde::{Deserialize, Serialize};

/// The outcome of one checker invocation against one rendered page.
///
/// A checker that errors is recorded here rather than failing the page;
/// the other checkers' findings still count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckerRun {
    /// Name of the checker that ran
    pub checker: String,

    /// Findings the checker reported (empty on a clean pass or on error)
    pub findings: Vec<Finding>,

    /// Wall-clock duration of the run in milliseconds
    pub duration_ms: u64,

    /// Error message when the checker failed or was unavailable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckerRun {
    /// Record a checker run that completed normally.
    #[must_use]
    pub fn succeeded(checker: impl Into<String>, findings: Vec<Finding>, duration_ms: u64) -> Self {
        Self {
            checker: checker.into(),
            findings,
            duration_ms,
            error: None,
        }
    }

    /// Record a checker run that errored.
    #[must_use]
    pub fn failed(checker: impl Into<String>, duration_ms: u64, error: impl Into<String>) -> Self {
        Self {
            checker: checker.into(),
            findings: Vec::new(),
            duration_ms,
            error: Some(error.into()),
        }
    }
}

/// Everything a scan learned about one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    /// Final URL of the page (after redirects)
    pub url: String,

    /// Document title, when the page rendered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// HTTP status of the main document response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,

    /// Time to render the page in milliseconds (0 when the render failed)
    pub load_time_ms: u64,

    /// One entry per checker invoked, in invocation order
    pub checker_runs: Vec<CheckerRun>,

    /// Error marker when the page itself could not be scanned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// When the page was scanned
    pub scanned_at: DateTime<Utc>,
}

impl PageResult {
    /// Build the result for a page that rendered and was checked.
    #[must_use]
    pub fn scanned(
        url: impl Into<String>,
        title: Option<String>,
        status_code: Option<u16>,
        load_time_ms: u64,
        checker_runs: Vec<CheckerRun>,
    ) -> Self {
        Self {
            url: url.into(),
            title,
            status_code,
            load_time_ms,
            checker_runs,
            error: None,
            scanned_at: Utc::now(),
        }
    }

    /// Build the result for a page that never rendered.
    #[must_use]
    pub fn failed(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
            status_code: None,
            load_time_ms: 0,
            checker_runs: Vec::new(),
            error: Some(error.into()),
            scanned_at: Utc::now(),
        }
    }

    /// Whether this page failed to scan.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Total findings across all checker runs on this page.
    #[must_use]
    pub fn finding_count(&self) -> usize {
        self.checker_runs.iter().map(|run| run.findings.len()).sum()
    }

    /// Iterate over every finding on this page, in checker order.
    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.checker_runs.iter().flat_map(|run| run.findings.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kerb_core::Severity;

    #[test]
    fn test_scanned_page_counts_findings_across_checkers() {
        let page = PageResult::scanned(
            "https://example.org/",
            Some("Home".to_string()),
            Some(200),
            512,
            vec![
                CheckerRun::succeeded(
                    "axe",
                    vec![Finding::new("image-alt", "Missing alt", Severity::Critical, "img", "axe")],
                    100,
                ),
                CheckerRun::succeeded(
                    "pa11y",
                    vec![
                        Finding::new("label", "Missing label", Severity::Serious, "input", "pa11y"),
                        Finding::new("region", "Content outside landmark", Severity::Moderate, "div", "pa11y"),
                    ],
                    150,
                ),
            ],
        );

        assert!(!page.is_failed());
        assert_eq!(page.finding_count(), 3);
        assert_eq!(page.findings().count(), 3);
    }

    #[test]
    fn test_failed_page_has_no_runs() {
        let page = PageResult::failed("https://example.org/broken", "navigation timed out");

        assert!(page.is_failed(), "error marker must flag the page as failed");
        assert_eq!(page.finding_count(), 0);
        assert!(page.checker_runs.is_empty());
        assert_eq!(page.load_time_ms, 0);
    }

    #[test]
    fn test_failed_checker_run_keeps_other_findings() {
        let page = PageResult::scanned(
            "https://example.org/",
            None,
            Some(200),
            300,
            vec![
                CheckerRun::failed("lighthouse", 5000, "checker timed out"),
                CheckerRun::succeeded(
                    "axe",
                    vec![Finding::new("html-has-lang", "No lang", Severity::Serious, "html", "axe")],
                    90,
                ),
            ],
        );

        assert!(!page.is_failed());
        assert_eq!(page.finding_count(), 1);
        assert!(page.checker_runs[0].error.is_some());
    }

    #[test]
    fn test_page_result_serialization_omits_absent_fields() {
        let page = PageResult::scanned("https://example.org/", None, None, 10, Vec::new());
        let json = serde_json::to_string(&page).expect("serialize page result");

        assert!(!json.contains("title"));
        assert!(!json.contains("status_code"));
        assert!(!json.contains("\"error\""));
    }
}
