//! The public face of the scanning engine.
//!
//! [`ScanOrchestrator`] owns the job queue and worker pool and exposes the
//! scan lifecycle: submit, observe, cancel, collect. It does not run scans
//! itself; it turns each request into a site orchestration job and lets the
//! pool drive it.

use crate::error::{Result, ScanError};
use crate::executor::ScanJobExecutor;
use crate::page_scanner::PageScanner;
use crate::progress::{self, NullProgress, ProgressHandler};
use crate::registry::{ScanHandle, ScanRegistry, ScanSnapshot};
use kerb_browser::Renderer;
use kerb_checker::CheckerRegistry;
use kerb_core::{QueueConfig, ScanConfig, ScanId, ScanState, SiteId};
use kerb_crawler::Crawler;
use kerb_queue::{JobQueue, PoolHealth, PoolStatus, QueueStats, ScanJob, WorkerPool};
use kerb_report::{ComplianceScorer, ScanResult, ScoreWeights};
use std::sync::{Arc, Mutex};
use tracing::info;

/// Progress events buffered per scan before emission applies backpressure
/// to the workers producing them.
const PROGRESS_BUFFER: usize = 64;

/// Coordinates crawls, page scans and result aggregation for a site audit.
///
/// Construct one per process, wire in a renderer and checker registry, then
/// [`start`](Self::start) the worker pool before submitting scans.
///
/// A site orchestration job occupies one pool worker for the scan's whole
/// lifetime, so run the pool with at least two workers or no page job will
/// ever be picked up.
pub struct ScanOrchestrator {
    registry: Arc<ScanRegistry>,
    queue: Arc<JobQueue>,
    renderer: Arc<dyn Renderer>,
    checkers: CheckerRegistry,
    queue_config: QueueConfig,
    weights: ScoreWeights,
    progress: Arc<dyn ProgressHandler>,
    pool: Mutex<Option<WorkerPool>>,
}

impl ScanOrchestrator {
    /// Create an orchestrator over a rendering engine and checker registry.
    ///
    /// The registry is shared: callers keep their own reference to query
    /// scans without going through the orchestrator.
    #[must_use]
    pub fn new(
        renderer: Arc<dyn Renderer>,
        checkers: CheckerRegistry,
        registry: Arc<ScanRegistry>,
        queue_config: QueueConfig,
    ) -> Self {
        Self {
            registry,
            queue: Arc::new(JobQueue::new(&queue_config)),
            renderer,
            checkers,
            queue_config,
            weights: ScoreWeights::default(),
            progress: Arc::new(NullProgress),
            pool: Mutex::new(None),
        }
    }

    /// Replace the default scoring weights.
    #[must_use]
    pub fn with_score_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Install a progress handler; it receives every scan's events.
    #[must_use]
    pub fn with_progress_handler(mut self, handler: Arc<dyn ProgressHandler>) -> Self {
        self.progress = handler;
        self
    }

    /// Start the worker pool with `workers` workers.
    pub fn start(&self, workers: usize) -> Result<()> {
        let mut slot = self.pool.lock().expect("acquire pool slot lock");
        if slot.is_some() {
            return Err(ScanError::Queue(kerb_queue::QueueError::PoolAlreadyRunning));
        }

        let crawler = Arc::new(Crawler::new(Arc::clone(&self.renderer)));
        let scanner = Arc::new(PageScanner::new(
            Arc::clone(&self.renderer),
            self.checkers.clone(),
        ));
        let executor = Arc::new(ScanJobExecutor::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.queue),
            crawler,
            scanner,
            ComplianceScorer::with_weights(self.weights.clone()),
        ));

        let pool = WorkerPool::new(Arc::clone(&self.queue), executor, self.queue_config.clone());
        pool.start(workers)?;
        *slot = Some(pool);
        info!(workers, "scan orchestrator started");
        Ok(())
    }

    /// Stop the worker pool, waiting for in-flight jobs up to the grace
    /// period.
    pub async fn shutdown(&self) -> Result<()> {
        let pool = self.pool.lock().expect("acquire pool slot lock").take();
        let Some(pool) = pool else {
            return Err(ScanError::Queue(kerb_queue::QueueError::PoolNotRunning));
        };
        pool.stop().await?;
        info!("scan orchestrator stopped");
        Ok(())
    }

    /// Whether the worker pool is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.pool.lock().expect("acquire pool slot lock").is_some()
    }

    /// Submit a scan of `base_url` and return its ID.
    ///
    /// Validation happens here so a bad configuration fails the submission
    /// rather than the scan. The returned ID is live immediately: status,
    /// cancellation and result collection all accept it from this point on.
    pub async fn start_scan(
        &self,
        site_id: SiteId,
        base_url: impl Into<String>,
        config: ScanConfig,
    ) -> Result<ScanId> {
        config.validate()?;
        if !self.is_running() {
            return Err(ScanError::NotRunning);
        }

        let base_url = base_url.into();
        let scan_id = ScanId::generate();
        let sender = progress::channel(Arc::clone(&self.progress), PROGRESS_BUFFER);
        let handle = Arc::new(ScanHandle::new(
            scan_id.clone(),
            site_id.clone(),
            base_url.clone(),
            config.clone(),
            sender,
        ));
        self.registry.insert(Arc::clone(&handle));

        // Emit before enqueueing so subscribers always see the scan enter
        // at Queued, even if a worker grabs the job immediately.
        handle.emit_progress(None, None).await;

        let job = ScanJob::site_orchestration(scan_id.clone(), site_id, base_url, config);
        match self.queue.enqueue(job) {
            Ok(job_id) => {
                handle.set_site_job(job_id);
                info!(scan_id = %scan_id, "scan queued");
                Ok(scan_id)
            }
            Err(err) => {
                self.registry.remove(&scan_id);
                handle.close_progress();
                Err(err.into())
            }
        }
    }

    /// Cancel a scan.
    ///
    /// A scan whose site job has not started yet is cancelled outright.
    /// A running scan stops cleanly: pending page jobs are withdrawn from
    /// the queue, in-flight ones finish naturally, and the scan settles
    /// into `Cancelled`. A scan already aggregating will still complete.
    pub async fn cancel_scan(&self, scan_id: &ScanId) -> Result<()> {
        let handle = self
            .registry
            .get(scan_id)
            .ok_or_else(|| ScanError::ScanNotFound {
                scan_id: scan_id.to_string(),
            })?;
        let state = handle.state();
        if state.is_terminal() {
            return Err(ScanError::AlreadyTerminal {
                scan_id: scan_id.to_string(),
                state,
            });
        }
        handle.cancel();

        if let Some(job_id) = handle.site_job() {
            if self.queue.cancel(&job_id).unwrap_or(false) {
                // The site job never started; no worker will run this scan
                // down, so finish it here.
                if handle.transition(ScanState::Cancelled) {
                    handle
                        .emit_progress(None, Some("cancelled before start".to_string()))
                        .await;
                }
                handle.close_progress();
                info!(scan_id = %scan_id, "scan cancelled before start");
                return Ok(());
            }
        }

        let mut drained = 0usize;
        for job_id in handle.page_jobs() {
            if let Ok(true) = self.queue.cancel(&job_id) {
                drained += 1;
            }
        }
        if drained > 0 {
            handle.settle_cancelled(drained);
        }
        info!(scan_id = %scan_id, drained, "scan cancellation requested");
        Ok(())
    }

    /// A point-in-time view of one scan.
    pub fn scan_status(&self, scan_id: &ScanId) -> Result<ScanSnapshot> {
        self.registry
            .get(scan_id)
            .map(|handle| handle.snapshot())
            .ok_or_else(|| ScanError::ScanNotFound {
                scan_id: scan_id.to_string(),
            })
    }

    /// Block until the scan finishes and return its result.
    ///
    /// Failed scans surface as [`ScanError::ScanFailed`] with the recorded
    /// cause; cancelled ones as [`ScanError::ScanCancelled`].
    pub async fn wait_for_result(&self, scan_id: &ScanId) -> Result<ScanResult> {
        let handle = self
            .registry
            .get(scan_id)
            .ok_or_else(|| ScanError::ScanNotFound {
                scan_id: scan_id.to_string(),
            })?;
        handle.wait_terminal().await;

        match handle.state() {
            ScanState::Completed => handle.result().ok_or_else(|| ScanError::ScanFailed {
                scan_id: scan_id.to_string(),
                message: "scan completed without a stored result".to_string(),
            }),
            ScanState::Cancelled => Err(ScanError::ScanCancelled {
                scan_id: scan_id.to_string(),
            }),
            state => {
                let message = handle
                    .snapshot()
                    .error
                    .unwrap_or_else(|| format!("scan ended in state {state}"));
                Err(ScanError::ScanFailed {
                    scan_id: scan_id.to_string(),
                    message,
                })
            }
        }
    }

    /// Worker counts for the running pool.
    pub fn pool_status(&self) -> Result<PoolStatus> {
        self.pool
            .lock()
            .expect("acquire pool slot lock")
            .as_ref()
            .map(WorkerPool::status)
            .ok_or(ScanError::NotRunning)
    }

    /// Pool health; `Stopped` when the pool has not been started.
    #[must_use]
    pub fn pool_health(&self) -> PoolHealth {
        self.pool
            .lock()
            .expect("acquire pool slot lock")
            .as_ref()
            .map_or(PoolHealth::Stopped, WorkerPool::health)
    }

    /// Add or remove workers; returns the new target count.
    pub fn scale_workers(&self, delta: i64) -> Result<usize> {
        let slot = self.pool.lock().expect("acquire pool slot lock");
        let Some(pool) = slot.as_ref() else {
            return Err(ScanError::NotRunning);
        };
        Ok(pool.scale(delta)?)
    }

    /// Live queue depth and status counts.
    #[must_use]
    pub fn queue_stats(&self) -> QueueStats {
        self.queue.stats()
    }
}
