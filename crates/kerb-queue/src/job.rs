//! Queued job model.

use chrono::{DateTime, Utc};
use kerb_core::{JobId, ScanConfig, ScanId, SiteId, WorkerId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Priority scale for queued jobs; higher runs first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobPriority {
    /// Background work
    Low = 1,
    /// Default for page-scan jobs
    Normal = 3,
    /// Default for site-orchestration jobs
    High = 5,
    /// Jump the line
    Urgent = 10,
}

impl JobPriority {
    /// Numeric value of this priority tier.
    #[must_use]
    pub fn value(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for JobPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Urgent => "urgent",
        };
        write!(f, "{name}")
    }
}

/// Lifecycle status of a queued job.
///
/// A job is always in exactly one of pending, running, or a terminal
/// status; the queue owns every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Waiting to be dequeued (possibly held back by a retry delay)
    Pending,
    /// Assigned to a worker and executing
    Running,
    /// Finished successfully
    Completed,
    /// Exhausted its attempts or failed non-retryably
    Failed,
    /// Cancelled before it was dispatched
    Cancelled,
}

impl JobStatus {
    /// Whether this status is terminal.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{name}")
    }
}

/// Discriminant for the two job kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobKind {
    /// Drives one whole site scan
    SiteOrchestration,
    /// Renders and checks one page
    PageScan,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SiteOrchestration => "site-orchestration",
            Self::PageScan => "page-scan",
        };
        write!(f, "{name}")
    }
}

/// What a job operates on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum JobPayload {
    /// Run a site scan end to end: crawl, fan out page jobs, aggregate
    SiteOrchestration {
        /// The scan this job drives
        scan_id: ScanId,
        /// The site being scanned
        site_id: SiteId,
        /// Crawl entry point
        base_url: String,
        /// Scan settings
        config: ScanConfig,
    },
    /// Render one page and run the named checkers against it
    PageScan {
        /// The scan this page belongs to
        scan_id: ScanId,
        /// The page to audit
        url: String,
        /// Checker names to run
        checkers: Vec<String>,
        /// Execution time budget for this job, in seconds
        timeout_secs: u64,
    },
}

impl JobPayload {
    /// The kind discriminant for this payload.
    #[must_use]
    pub fn kind(&self) -> JobKind {
        match self {
            Self::SiteOrchestration { .. } => JobKind::SiteOrchestration,
            Self::PageScan { .. } => JobKind::PageScan,
        }
    }

    /// The scan this payload belongs to.
    #[must_use]
    pub fn scan_id(&self) -> &ScanId {
        match self {
            Self::SiteOrchestration { scan_id, .. } | Self::PageScan { scan_id, .. } => scan_id,
        }
    }
}

/// Why a job execution failed, and whether retrying can help.
#[derive(Debug, Clone)]
pub struct JobFailure {
    /// Human-readable failure description
    pub message: String,
    /// Whether the queue may re-attempt the job
    pub retryable: bool,
}

impl JobFailure {
    /// A failure worth retrying (transient render errors, timeouts).
    #[must_use]
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    /// A failure that retrying cannot fix.
    #[must_use]
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }
}

/// A unit of queued work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanJob {
    /// Unique identifier for this job
    pub id: JobId,
    /// What the job does
    pub payload: JobPayload,
    /// Scheduling priority
    pub priority: JobPriority,
    /// Current lifecycle status
    pub status: JobStatus,
    /// How many attempts have failed so far
    pub attempt: u32,
    /// Attempts allowed before the job is terminally failed
    pub max_attempts: u32,
    /// When the job was created
    pub created_at: DateTime<Utc>,
    /// When the job last changed status
    pub updated_at: DateTime<Utc>,
    /// The worker currently (or last) executing the job
    pub assigned_worker: Option<WorkerId>,
    /// Message from the most recent failure
    pub last_error: Option<String>,
}

impl ScanJob {
    /// Create a pending job.
    #[must_use]
    pub fn new(payload: JobPayload, priority: JobPriority, max_attempts: u32) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::generate(),
            payload,
            priority,
            status: JobStatus::Pending,
            attempt: 0,
            max_attempts: max_attempts.max(1),
            created_at: now,
            updated_at: now,
            assigned_worker: None,
            last_error: None,
        }
    }

    /// Create a page-scan job at normal priority.
    #[must_use]
    pub fn page_scan(
        scan_id: ScanId,
        url: impl Into<String>,
        checkers: Vec<String>,
        timeout_secs: u64,
        max_attempts: u32,
    ) -> Self {
        Self::new(
            JobPayload::PageScan {
                scan_id,
                url: url.into(),
                checkers,
                timeout_secs,
            },
            JobPriority::Normal,
            max_attempts,
        )
    }

    /// Create a site-orchestration job at high priority.
    ///
    /// Site jobs are never retried: a failed scan is reported, not
    /// silently re-run from scratch.
    #[must_use]
    pub fn site_orchestration(
        scan_id: ScanId,
        site_id: SiteId,
        base_url: impl Into<String>,
        config: ScanConfig,
    ) -> Self {
        Self::new(
            JobPayload::SiteOrchestration {
                scan_id,
                site_id,
                base_url: base_url.into(),
                config,
            },
            JobPriority::High,
            1,
        )
    }

    /// The kind discriminant for this job.
    #[must_use]
    pub fn kind(&self) -> JobKind {
        self.payload.kind()
    }

    /// Retry delay for this job's current attempt count: `base * 2^attempt`,
    /// capped.
    #[must_use]
    pub fn backoff_delay(&self, base: Duration, cap: Duration) -> Duration {
        let factor = 2u32.saturating_pow(self.attempt.min(16));
        base.saturating_mul(factor).min(cap)
    }
}
