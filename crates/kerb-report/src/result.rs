//! The final scan report.

use crate::page::PageResult;
use crate::score::ComplianceScore;
use crate::violation::Violation;
use chrono::{DateTime, Utc};
use kerb_core::{ScanId, ScanState, Severity, SiteId};
use serde::{Deserialize, Serialize};

/// Violation tallies by severity tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    /// Critical violations
    pub critical: usize,
    /// Serious violations
    pub serious: usize,
    /// Moderate violations
    pub moderate: usize,
    /// Minor violations
    pub minor: usize,
}

impl SeverityCounts {
    /// Tally a violation list.
    #[must_use]
    pub fn tally(violations: &[Violation]) -> Self {
        let mut counts = Self::default();
        for violation in violations {
            match violation.severity {
                Severity::Critical => counts.critical += 1,
                Severity::Serious => counts.serious += 1,
                Severity::Moderate => counts.moderate += 1,
                Severity::Minor => counts.minor += 1,
            }
        }
        counts
    }

    /// Total violations across all tiers.
    #[must_use]
    pub fn total(&self) -> usize {
        self.critical + self.serious + self.moderate + self.minor
    }
}

/// Headline numbers for one scan.
///
/// `pages_discovered == pages_scanned + pages_failed` holds for every scan
/// that ran to a terminal state without being cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Pages the crawl discovered
    pub pages_discovered: usize,
    /// Pages that rendered and were checked
    pub pages_scanned: usize,
    /// Pages that never rendered
    pub pages_failed: usize,
    /// Deduplicated violations across all pages
    pub total_violations: usize,
    /// Violations broken down by severity
    pub by_severity: SeverityCounts,
}

impl ScanSummary {
    /// Compute the summary from the page results and aggregated violations.
    #[must_use]
    pub fn compute(pages_discovered: usize, pages: &[PageResult], violations: &[Violation]) -> Self {
        let pages_failed = pages.iter().filter(|p| p.is_failed()).count();
        Self {
            pages_discovered,
            pages_scanned: pages.len() - pages_failed,
            pages_failed,
            total_violations: violations.len(),
            by_severity: SeverityCounts::tally(violations),
        }
    }
}

/// Everything a finished scan produced.
///
/// A partially failed scan still yields a full result; the summary separates
/// scanned from failed pages so the report stays honest about coverage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    /// Scan this result belongs to
    pub scan_id: ScanId,

    /// Site that was scanned
    pub site_id: SiteId,

    /// URL the crawl started from
    pub base_url: String,

    /// Terminal state the scan reached
    pub state: ScanState,

    /// One entry per discovered page, failed renders included
    pub pages: Vec<PageResult>,

    /// Deduplicated violations, ordered for reporting
    pub violations: Vec<Violation>,

    /// Weighted compliance score
    pub score: ComplianceScore,

    /// Headline numbers
    pub summary: ScanSummary,

    /// When the scan started
    pub started_at: DateTime<Utc>,

    /// When the scan reached its terminal state
    pub finished_at: DateTime<Utc>,

    /// Originating cause when the scan failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
