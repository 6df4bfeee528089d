//! Job execution: the scan logic workers run.
//!
//! Two job kinds flow through the pool. A site orchestration job drives one
//! scan end to end (crawl, fan out page jobs, wait, aggregate); a page scan
//! job audits a single URL. Both are routed here through the
//! [`JobExecutor`] seam, so the pool itself stays scan-agnostic.

use crate::page_scanner::PageScanner;
use crate::registry::{ScanHandle, ScanRegistry};
use async_trait::async_trait;
use chrono::Utc;
use kerb_core::{ScanConfig, ScanId, ScanState};
use kerb_crawler::Crawler;
use kerb_queue::{JobExecutor, JobFailure, JobPayload, JobQueue, QueueError, ScanJob};
use kerb_report::{aggregate, ComplianceScorer, PageResult, ScanResult, ScanSummary};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// How long a site job sleeps before retrying a full queue.
const QUEUE_FULL_RETRY_MS: u64 = 250;

/// Executes scan jobs against the registry, crawler and page scanner.
pub struct ScanJobExecutor {
    registry: Arc<ScanRegistry>,
    queue: Arc<JobQueue>,
    crawler: Arc<Crawler>,
    scanner: Arc<PageScanner>,
    scorer: ComplianceScorer,
}

impl ScanJobExecutor {
    /// Create an executor over the orchestrator's collaborators.
    #[must_use]
    pub fn new(
        registry: Arc<ScanRegistry>,
        queue: Arc<JobQueue>,
        crawler: Arc<Crawler>,
        scanner: Arc<PageScanner>,
        scorer: ComplianceScorer,
    ) -> Self {
        Self {
            registry,
            queue,
            crawler,
            scanner,
            scorer,
        }
    }

    /// Drive one scan end to end.
    ///
    /// Runs on a pool worker for the scan's whole lifetime; page jobs it
    /// fans out are picked up by the other workers.
    async fn run_site(
        &self,
        scan_id: &ScanId,
        base_url: &str,
        config: &ScanConfig,
    ) -> std::result::Result<(), JobFailure> {
        let Some(handle) = self.registry.get(scan_id) else {
            return Err(JobFailure::fatal(format!("scan {scan_id} is not registered")));
        };
        if handle.is_cancelled() {
            self.finish_cancelled(&handle).await;
            return Ok(());
        }

        handle.transition(ScanState::Crawling);
        handle.emit_progress(Some(base_url.to_string()), None).await;

        let outcome = match self.crawler.discover(base_url, config).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(scan_id = %scan_id, error = %err, "crawl failed");
                let message = format!("crawl failed: {err}");
                self.finish_failed(&handle, &message).await;
                return Err(JobFailure::fatal(message));
            }
        };
        if outcome.urls.is_empty() {
            let message = "crawl discovered no pages".to_string();
            self.finish_failed(&handle, &message).await;
            return Err(JobFailure::fatal(message));
        }
        info!(
            scan_id = %scan_id,
            discovered = outcome.urls.len(),
            attempted = outcome.attempted,
            failed = outcome.failed,
            "crawl finished"
        );
        handle.set_discovered(outcome.urls.len());

        handle.transition(ScanState::Scanning);
        handle.emit_progress(None, None).await;

        let mut enqueued = 0usize;
        'pages: for url in &outcome.urls {
            loop {
                if handle.is_cancelled() {
                    break 'pages;
                }
                let job = ScanJob::page_scan(
                    scan_id.clone(),
                    url.clone(),
                    config.checkers.clone(),
                    config.per_job_timeout_secs,
                    config.max_retries,
                );
                match self.queue.enqueue(job) {
                    Ok(job_id) => {
                        handle.record_job(job_id);
                        enqueued += 1;
                        break;
                    }
                    Err(QueueError::Full { .. }) => {
                        tokio::time::sleep(Duration::from_millis(QUEUE_FULL_RETRY_MS)).await;
                    }
                    Err(err) => {
                        let message = format!("enqueue failed: {err}");
                        self.finish_failed(&handle, &message).await;
                        return Err(JobFailure::fatal(message));
                    }
                }
            }
        }
        if enqueued < outcome.urls.len() {
            // Cancelled mid fan-out; only await what actually got queued.
            handle.set_expected(enqueued);
        }

        handle.wait_settled().await;

        if handle.is_cancelled() {
            self.finish_cancelled(&handle).await;
            return Ok(());
        }

        handle.transition(ScanState::Aggregating);
        handle.emit_progress(None, None).await;

        let pages = handle.take_pages();
        let violations = aggregate(&pages);
        let score = self.scorer.score(&violations, pages.len());
        let summary = ScanSummary::compute(handle.pages_discovered(), &pages, &violations);
        info!(
            scan_id = %scan_id,
            pages = pages.len(),
            violations = violations.len(),
            score = score.overall,
            "scan completed"
        );

        let result = ScanResult {
            scan_id: scan_id.clone(),
            site_id: handle.site_id().clone(),
            base_url: handle.base_url().to_string(),
            state: ScanState::Completed,
            pages,
            violations,
            score,
            summary,
            started_at: handle.started_at(),
            finished_at: Utc::now(),
            error: None,
        };
        handle.store_result(result);
        handle.transition(ScanState::Completed);
        handle.emit_progress(None, None).await;
        handle.close_progress();
        Ok(())
    }

    /// Audit one page and record the outcome on its scan.
    async fn run_page(
        &self,
        scan_id: &ScanId,
        url: &str,
        checkers: &[String],
    ) -> std::result::Result<(), JobFailure> {
        let Some(handle) = self.registry.get(scan_id) else {
            return Err(JobFailure::fatal(format!("scan {scan_id} is not registered")));
        };
        if handle.is_cancelled() {
            // Drain as a no-op so the scan's accounting still settles.
            handle.settle_cancelled(1);
            return Ok(());
        }

        match self.scanner.scan(url, checkers, handle.cancel_token()).await {
            Ok(page) => {
                handle.record_page(page).await;
                Ok(())
            }
            Err(crate::error::ScanError::Render(err)) if err.is_retryable() => {
                Err(JobFailure::retryable(err.to_string()))
            }
            Err(err) => Err(JobFailure::fatal(err.to_string())),
        }
    }

    async fn finish_failed(&self, handle: &ScanHandle, message: &str) {
        if handle.transition(ScanState::Failed) {
            handle.set_error(message);
            handle.emit_progress(None, Some(message.to_string())).await;
        }
        handle.close_progress();
    }

    async fn finish_cancelled(&self, handle: &ScanHandle) {
        if handle.transition(ScanState::Cancelled) {
            handle.emit_progress(None, Some("scan cancelled".to_string())).await;
        }
        handle.close_progress();
    }
}

#[async_trait]
impl JobExecutor for ScanJobExecutor {
    async fn execute(&self, job: &ScanJob) -> std::result::Result<(), JobFailure> {
        match &job.payload {
            JobPayload::SiteOrchestration {
                scan_id,
                base_url,
                config,
                ..
            } => self.run_site(scan_id, base_url, config).await,
            JobPayload::PageScan {
                scan_id, url, checkers, ..
            } => self.run_page(scan_id, url, checkers).await,
        }
    }

    async fn on_terminal_failure(&self, job: &ScanJob) {
        match &job.payload {
            JobPayload::PageScan { scan_id, url, .. } => {
                let Some(handle) = self.registry.get(scan_id) else {
                    return;
                };
                let message = job.last_error.clone().unwrap_or_else(|| {
                    format!("page scan failed after {} attempts", job.attempt)
                });
                warn!(scan_id = %scan_id, url = %url, %message, "page terminally failed");
                handle.record_page(PageResult::failed(url.clone(), message)).await;
            }
            JobPayload::SiteOrchestration { scan_id, .. } => {
                let Some(handle) = self.registry.get(scan_id) else {
                    return;
                };
                let message = job
                    .last_error
                    .clone()
                    .unwrap_or_else(|| "site orchestration failed".to_string());
                error!(scan_id = %scan_id, %message, "site orchestration terminally failed");
                self.finish_failed(&handle, &message).await;
                // Stop the page jobs the dead scan already fanned out.
                handle.cancel();
                for job_id in handle.page_jobs() {
                    if let Ok(true) = self.queue.cancel(&job_id) {
                        handle.settle_cancelled(1);
                    }
                }
            }
        }
    }
}
