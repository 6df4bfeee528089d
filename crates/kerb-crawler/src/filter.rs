//! Admission filters applied to every candidate URL.

use crate::error::{CrawlError, Result};
use regex::Regex;
use url::Url;

/// File extensions that never hold scannable HTML.
const SKIP_EXTENSIONS: &[&str] = &[
    "pdf", "zip", "tar", "gz", "jpg", "jpeg", "png", "gif", "svg", "webp", "ico", "css", "js",
    "xml", "json", "txt", "mp4", "woff", "woff2",
];

/// Whether a URL's final path segment looks like an HTML document rather
/// than a binary or asset download.
#[must_use]
pub fn is_scannable_target(url: &Url) -> bool {
    let segment = url.path().rsplit('/').next().unwrap_or("");
    match segment.rsplit_once('.') {
        Some((_, ext)) => !SKIP_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()),
        None => true,
    }
}

/// Compiled include/exclude patterns from the scan configuration.
///
/// A URL is admitted when it matches at least one include pattern (an
/// empty include set admits everything) and matches no exclude pattern.
/// Exclusion wins over inclusion.
#[derive(Debug)]
pub struct UrlFilters {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl UrlFilters {
    /// Compile the configured pattern lists.
    ///
    /// # Errors
    /// Returns `InvalidPattern` for the first pattern that fails to
    /// compile. Scan configs are validated before work starts, so this
    /// firing mid-pipeline means the config was never validated.
    pub fn compile(include: &[String], exclude: &[String]) -> Result<Self> {
        let compile = |patterns: &[String]| -> Result<Vec<Regex>> {
            patterns
                .iter()
                .map(|pattern| {
                    Regex::new(pattern).map_err(|e| CrawlError::InvalidPattern {
                        pattern: pattern.clone(),
                        reason: e.to_string(),
                    })
                })
                .collect()
        };

        Ok(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
        })
    }

    /// Whether the URL passes the pattern filters.
    #[must_use]
    pub fn admits(&self, url: &str) -> bool {
        if self.exclude.iter().any(|re| re.is_match(url)) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|re| re.is_match(url))
    }
}
