//! Single-page scan: render, run checkers, collect the runs.

use crate::error::Result;
use futures::stream::{FuturesUnordered, StreamExt};
use kerb_browser::Renderer;
use kerb_checker::CheckerRegistry;
use kerb_report::{CheckerRun, PageResult};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Renders one page and runs the configured checkers against it.
///
/// Checkers run concurrently over the same rendered snapshot. A checker
/// that errors is recorded in its [`CheckerRun`] rather than failing the
/// page, so one flaky engine never discards the others' findings.
pub struct PageScanner {
    renderer: Arc<dyn Renderer>,
    checkers: CheckerRegistry,
}

impl PageScanner {
    /// Create a scanner over a rendering engine and a checker registry.
    #[must_use]
    pub fn new(renderer: Arc<dyn Renderer>, checkers: CheckerRegistry) -> Self {
        Self { renderer, checkers }
    }

    /// Scan one URL with the named checkers.
    ///
    /// Returns an error only when the page itself cannot be rendered;
    /// checker failures are folded into the result. A cancellation observed
    /// before the fan-out skips the checkers but still releases the page.
    #[allow(clippy::cast_possible_truncation)]
    pub async fn scan(
        &self,
        url: &str,
        checker_names: &[String],
        cancel: &CancellationToken,
    ) -> Result<PageResult> {
        let page = self.renderer.load(url).await?;
        debug!(url = %page.url, links = page.links.len(), "page rendered");

        let mut runs = Vec::with_capacity(checker_names.len());
        {
            let page_ref = &page;
            let mut pending = FuturesUnordered::new();
            for name in checker_names {
                if cancel.is_cancelled() {
                    break;
                }
                let checker = match self.checkers.get(name) {
                    Ok(checker) => checker,
                    Err(error) => {
                        warn!(checker = %name, %error, "checker unavailable");
                        runs.push(CheckerRun::failed(name.clone(), 0, error.to_string()));
                        continue;
                    }
                };
                pending.push(async move {
                    let started = Instant::now();
                    let outcome = checker.run(page_ref).await;
                    (name, started.elapsed(), outcome)
                });
            }

            while let Some((name, elapsed, outcome)) = pending.next().await {
                let duration_ms = elapsed.as_millis() as u64;
                match outcome {
                    Ok(findings) => {
                        runs.push(CheckerRun::succeeded(name.clone(), findings, duration_ms));
                    }
                    Err(error) => {
                        warn!(checker = %name, %error, "checker failed");
                        runs.push(CheckerRun::failed(name.clone(), duration_ms, error.to_string()));
                    }
                }
            }
        }
        // Completion order is nondeterministic; restore the configured order.
        runs.sort_by_key(|run| checker_names.iter().position(|name| name == &run.checker));

        let result = PageResult::scanned(
            page.url.clone(),
            page.title.clone(),
            page.status_code,
            page.load_time_ms,
            runs,
        );
        self.renderer.close(page).await;
        Ok(result)
    }
}
