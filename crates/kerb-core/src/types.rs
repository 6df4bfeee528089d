//! Shared types used across the Kerb scanner.
//!
//! This module defines common newtypes and enums that provide type safety
//! and clear domain modeling.

use crate::error::KerbError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Newtype for scan identifiers with validation.
///
/// Scan IDs must be valid UUIDs (v4 format).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanId(String);

impl ScanId {
    /// Create a new `ScanId` from a string.
    ///
    /// # Errors
    /// Returns error if the ID is not a valid UUID v4.
    pub fn new(id: impl Into<String>) -> Result<Self, KerbError> {
        let id = id.into();
        validate_uuid(&id, "scan ID")?;
        Ok(Self(id))
    }

    /// Create a new random `ScanId` using UUID v4.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Newtype for queued-job identifiers with validation.
///
/// Job IDs must be valid UUIDs (v4 format).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(String);

impl JobId {
    /// Create a new `JobId` from a string.
    ///
    /// # Errors
    /// Returns error if the ID is not a valid UUID v4.
    pub fn new(id: impl Into<String>) -> Result<Self, KerbError> {
        let id = id.into();
        validate_uuid(&id, "job ID")?;
        Ok(Self(id))
    }

    /// Create a new random `JobId` using UUID v4.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validate that a string is a valid UUID v4.
fn validate_uuid(id: &str, what: &str) -> Result<(), KerbError> {
    static UUID_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = UUID_REGEX.get_or_init(|| {
        Regex::new(r"^[0-9a-f]{8}-[0-9a-f]{4}-4[0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$")
            .expect("valid regex")
    });

    if regex.is_match(id) {
        Ok(())
    } else {
        Err(KerbError::Validation(format!(
            "invalid {what}: must be a valid UUID v4, got '{id}'"
        )))
    }
}

/// Newtype for site identifiers with validation.
///
/// Site IDs must be lowercase alphanumeric with hyphens, 3-50 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SiteId(String);

impl SiteId {
    /// Create a new `SiteId` from a string.
    ///
    /// # Errors
    /// Returns error if the ID doesn't match the required format.
    pub fn new(id: impl Into<String>) -> Result<Self, KerbError> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validate site ID format: lowercase alphanumeric with hyphens, 3-50 chars.
    fn validate(id: &str) -> Result<(), KerbError> {
        static SITE_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex = SITE_REGEX
            .get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9-]{1,48}[a-z0-9]$").expect("valid regex"));

        if id.len() < 3 || id.len() > 50 {
            return Err(KerbError::Validation(format!(
                "invalid site ID: must be 3-50 characters, got {} characters",
                id.len()
            )));
        }

        if regex.is_match(id) {
            Ok(())
        } else {
            Err(KerbError::Validation(format!(
                "invalid site ID: must be lowercase alphanumeric with hyphens, got '{id}'"
            )))
        }
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Display label for a worker in the pool (`worker-0`, `worker-1`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkerId(String);

impl WorkerId {
    /// Create a worker ID from a pool slot index.
    #[must_use]
    pub fn from_index(index: usize) -> Self {
        Self(format!("worker-{index}"))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Impact tier of a finding or violation.
///
/// Ordered so that `Critical` compares greatest, which lets severity
/// disagreements between checkers resolve with `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Cosmetic or advisory issues
    Minor,
    /// Issues that degrade the experience for some users
    Moderate,
    /// Issues that block common assistive-technology flows
    Serious,
    /// Issues that make content unusable for affected users
    Critical,
}

impl Severity {
    /// Scoring weight for this severity tier.
    #[must_use]
    pub fn weight(&self) -> f64 {
        match self {
            Self::Critical => 10.0,
            Self::Serious => 5.0,
            Self::Moderate => 2.0,
            Self::Minor => 1.0,
        }
    }

    /// Parse a severity from its lowercase name. Unknown values yield `None`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "critical" => Some(Self::Critical),
            "serious" => Some(Self::Serious),
            "moderate" => Some(Self::Moderate),
            "minor" => Some(Self::Minor),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Critical => "critical",
            Self::Serious => "serious",
            Self::Moderate => "moderate",
            Self::Minor => "minor",
        };
        write!(f, "{name}")
    }
}

/// WCAG conformance level of a rule.
///
/// Level A rules are the strictest requirements, so they carry the largest
/// scoring weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConformanceLevel {
    /// Minimum conformance
    A,
    /// Mid-tier conformance
    AA,
    /// Highest conformance
    AAA,
}

impl ConformanceLevel {
    /// Scoring weight for this level.
    #[must_use]
    pub fn weight(&self) -> f64 {
        match self {
            Self::A => 3.0,
            Self::AA => 2.0,
            Self::AAA => 1.0,
        }
    }

    /// Parse a level from its name, case-insensitively.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Some(Self::A),
            "AA" => Some(Self::AA),
            "AAA" => Some(Self::AAA),
            _ => None,
        }
    }
}

impl fmt::Display for ConformanceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::A => "A",
            Self::AA => "AA",
            Self::AAA => "AAA",
        };
        write!(f, "{name}")
    }
}

/// WCAG principle a rule belongs to; the per-category scoring axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Principle {
    /// Content must be presentable in ways users can perceive
    Perceivable,
    /// Interface components must be operable
    Operable,
    /// Information and operation must be understandable
    Understandable,
    /// Content must be robust across user agents and assistive tech
    Robust,
}

impl Principle {
    /// All principles, in WCAG order.
    #[must_use]
    pub fn all() -> [Principle; 4] {
        [
            Self::Perceivable,
            Self::Operable,
            Self::Understandable,
            Self::Robust,
        ]
    }
}

impl fmt::Display for Principle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Perceivable => "perceivable",
            Self::Operable => "operable",
            Self::Understandable => "understandable",
            Self::Robust => "robust",
        };
        write!(f, "{name}")
    }
}

/// Lifecycle state of a site scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanState {
    /// Accepted, not yet started
    Queued,
    /// Discovering the page set
    Crawling,
    /// Page jobs in flight
    Scanning,
    /// Merging findings and computing scores
    Aggregating,
    /// Finished; results available
    Completed,
    /// Aborted by a fatal error
    Failed,
    /// Stopped by the caller
    Cancelled,
}

impl ScanState {
    /// Whether this state is terminal (no further transitions).
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Queued => "queued",
            Self::Crawling => "crawling",
            Self::Scanning => "scanning",
            Self::Aggregating => "aggregating",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{name}")
    }
}
