//! Subprocess adapter for external checker tools.

use crate::checker::Checker;
use crate::error::{CheckerError, Result};
use crate::finding::Finding;
use async_trait::async_trait;
use kerb_browser::RenderedPage;
use kerb_core::{ConformanceLevel, Severity};
use serde::Deserialize;
use std::io::Write;
use std::process::Stdio;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::{debug, warn};

/// Argument placeholder replaced with the page URL.
pub const URL_PLACEHOLDER: &str = "{url}";

/// Argument placeholder replaced with the path of a scratch file holding
/// the rendered HTML.
pub const HTML_PLACEHOLDER: &str = "{html}";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// One issue object in a command checker's stdout array.
///
/// External tools report `[{rule, description, selector, impact?, context?,
/// help_url?, wcag_criteria?, level?}, ...]` as JSON on stdout.
#[derive(Debug, Deserialize)]
struct RawIssue {
    rule: String,
    description: String,
    selector: String,
    #[serde(default)]
    impact: Option<String>,
    #[serde(default)]
    context: Option<String>,
    #[serde(default)]
    help_url: Option<String>,
    #[serde(default)]
    wcag_criteria: Vec<String>,
    #[serde(default)]
    level: Option<String>,
}

/// Adapter that runs an external checker tool as a subprocess.
///
/// The configured argument list may contain [`URL_PLACEHOLDER`] and
/// [`HTML_PLACEHOLDER`]; both are substituted per run. A missing executable
/// maps to [`CheckerError::Unavailable`], a non-zero exit to
/// [`CheckerError::Failed`], and unparseable stdout to
/// [`CheckerError::InvalidOutput`].
pub struct CommandChecker {
    name: String,
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandChecker {
    /// Create an adapter for the given tool invocation.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        program: impl Into<String>,
        args: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the per-run time budget.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn substitute(args: &[String], url: &str, html_path: Option<&str>) -> Vec<String> {
        args.iter()
            .map(|arg| {
                let arg = arg.replace(URL_PLACEHOLDER, url);
                match html_path {
                    Some(path) => arg.replace(HTML_PLACEHOLDER, path),
                    None => arg,
                }
            })
            .collect()
    }

    fn parse_output(&self, stdout: &[u8]) -> Result<Vec<Finding>> {
        let issues: Vec<RawIssue> =
            serde_json::from_slice(stdout).map_err(|e| CheckerError::InvalidOutput {
                checker: self.name.clone(),
                reason: e.to_string(),
            })?;

        let findings = issues
            .into_iter()
            .map(|issue| {
                let impact = issue
                    .impact
                    .as_deref()
                    .and_then(Severity::parse)
                    .unwrap_or_else(|| {
                        debug!(
                            checker = %self.name,
                            rule = %issue.rule,
                            impact = ?issue.impact,
                            "unrecognized impact, defaulting to moderate"
                        );
                        Severity::Moderate
                    });

                Finding {
                    rule: issue.rule,
                    description: issue.description,
                    impact,
                    selector: issue.selector,
                    checker: self.name.clone(),
                    context: issue.context,
                    help_url: issue.help_url,
                    wcag_criteria: issue.wcag_criteria,
                    level: issue.level.as_deref().and_then(ConformanceLevel::parse),
                }
            })
            .collect();

        Ok(findings)
    }
}

#[async_trait]
impl Checker for CommandChecker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, page: &RenderedPage) -> Result<Vec<Finding>> {
        // Spill the snapshot to disk only when the tool asks for it.
        let wants_html = self.args.iter().any(|a| a.contains(HTML_PLACEHOLDER));
        let html_file = if wants_html {
            let mut file = NamedTempFile::new()?;
            file.write_all(page.html.as_bytes())?;
            Some(file)
        } else {
            None
        };
        let html_path = html_file
            .as_ref()
            .map(|f| f.path().display().to_string());

        let args = Self::substitute(&self.args, &page.url, html_path.as_deref());

        debug!(checker = %self.name, url = %page.url, "invoking external checker");

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    CheckerError::Unavailable {
                        checker: self.name.clone(),
                        reason: format!("{} not found", self.program),
                    }
                } else {
                    CheckerError::Failed {
                        checker: self.name.clone(),
                        reason: format!("could not spawn {}: {e}", self.program),
                    }
                }
            })?;

        // kill_on_drop reaps the process if the timeout drops the future.
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| CheckerError::Timeout {
                checker: self.name.clone(),
                timeout_secs: self.timeout.as_secs(),
            })??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let excerpt: String = stderr.trim().chars().take(200).collect();
            warn!(checker = %self.name, status = ?output.status.code(), "checker exited non-zero");
            return Err(CheckerError::Failed {
                checker: self.name.clone(),
                reason: match output.status.code() {
                    Some(code) => format!("exit status {code}: {excerpt}"),
                    None => format!("terminated by signal: {excerpt}"),
                },
            });
        }

        self.parse_output(&output.stdout)
    }
}
