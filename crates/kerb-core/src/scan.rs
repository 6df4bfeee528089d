//! Per-scan configuration and the site model.
//!
//! A [`ScanConfig`] travels with every scan: it bounds the crawl, names the
//! checkers to run, and sizes the worker/retry budget. It validates before
//! any work is queued; a config that fails validation is rejected
//! synchronously.

use crate::error::{ConfigError, ConfigResult};
use crate::types::SiteId;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Configuration for one site scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Maximum link distance from the start URL
    pub max_depth: u32,
    /// Maximum number of pages to discover
    pub max_pages: usize,
    /// Names of the checkers to run against each page
    pub checkers: Vec<String>,
    /// Number of pool workers the scan may assume
    pub concurrent_workers: usize,
    /// Timeout for a single page-scan job, in seconds
    pub per_job_timeout_secs: u64,
    /// Maximum attempts per job before it is terminally failed
    pub max_retries: u32,
    /// Regex patterns a URL must match to be crawled (empty = match all)
    pub include_patterns: Vec<String>,
    /// Regex patterns that exclude a URL from the crawl
    pub exclude_patterns: Vec<String>,
    /// Restrict the crawl to the start URL's domain
    pub same_domain_only: bool,
    /// Seed the frontier from sitemap.xml when available
    pub use_sitemap: bool,
    /// Honor robots.txt Disallow rules during the crawl
    pub respect_robots_txt: bool,
    /// Crawl failure rate (0..=1] that aborts the scan
    pub abort_failure_ratio: f64,
    /// Minimum fetch attempts before the abort ratio is evaluated
    pub min_fetches_before_abort: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_pages: 50,
            checkers: vec!["axe".to_string()],
            concurrent_workers: 4,
            per_job_timeout_secs: 60,
            max_retries: 3,
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            same_domain_only: true,
            use_sitemap: true,
            respect_robots_txt: true,
            abort_failure_ratio: 0.5,
            min_fetches_before_abort: 4,
        }
    }
}

impl ScanConfig {
    /// Validate the configuration.
    ///
    /// Checks value ranges and compiles every include/exclude pattern so
    /// that a bad regex surfaces here rather than mid-crawl.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` or `ConfigError::InvalidPattern`
    /// describing the first problem found.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_pages == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_pages".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        if self.concurrent_workers == 0 {
            return Err(ConfigError::InvalidValue {
                field: "concurrent_workers".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        if self.per_job_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "per_job_timeout_secs".to_string(),
                reason: "must be at least 1 second".to_string(),
            });
        }

        if self.checkers.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "checkers".to_string(),
                reason: "at least one checker must be named".to_string(),
            });
        }

        if !(self.abort_failure_ratio > 0.0 && self.abort_failure_ratio <= 1.0) {
            return Err(ConfigError::InvalidValue {
                field: "abort_failure_ratio".to_string(),
                reason: format!("must be in (0, 1], got {}", self.abort_failure_ratio),
            });
        }

        for pattern in self.include_patterns.iter().chain(&self.exclude_patterns) {
            Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                reason: e.to_string(),
            })?;
        }

        Ok(())
    }
}

/// A site registered for auditing.
///
/// Created by a user-facing collaborator and treated as immutable for the
/// duration of a scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    /// Stable site identifier
    pub id: SiteId,
    /// Human-readable label
    pub name: Option<String>,
    /// Crawl entry point
    pub base_url: String,
    /// Crawl and scan settings for this site
    pub config: ScanConfig,
}

impl Site {
    /// Create a site with default scan configuration.
    #[must_use]
    pub fn new(id: SiteId, base_url: impl Into<String>) -> Self {
        Self {
            id,
            name: None,
            base_url: base_url.into(),
            config: ScanConfig::default(),
        }
    }

    /// Replace the scan configuration.
    #[must_use]
    pub fn with_config(mut self, config: ScanConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}
