//! Error types for the crawl subsystem.

use thiserror::Error;

/// Errors that can occur during page discovery.
#[derive(Error, Debug)]
pub enum CrawlError {
    /// The failure-rate threshold was exceeded; the scan must not proceed
    #[error("crawl aborted after {failed} of {attempted} fetches failed (threshold {threshold})")]
    Aborted {
        /// Fetch attempts made before aborting
        attempted: usize,
        /// How many of those attempts failed
        failed: usize,
        /// The configured failure-rate threshold
        threshold: f64,
    },

    /// The start URL could not be parsed or is not crawlable
    #[error("invalid start URL {url}: {reason}")]
    InvalidStartUrl {
        /// The offending URL
        url: String,
        /// Why it was rejected
        reason: String,
    },

    /// An include/exclude pattern failed to compile
    #[error("invalid URL pattern {pattern}: {reason}")]
    InvalidPattern {
        /// The offending pattern
        pattern: String,
        /// Regex compile error
        reason: String,
    },
}

/// Result type for crawl operations.
pub type Result<T> = std::result::Result<T, CrawlError>;
