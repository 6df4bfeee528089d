//! Worker pool that drains the job queue.
//!
//! The pool owns nothing about job semantics. It dequeues, enforces the
//! per-kind timeout, and reports the outcome back to the queue; what a job
//! actually does lives behind the [`JobExecutor`] seam.

use crate::error::{QueueError, Result};
use crate::job::{JobFailure, JobPayload, ScanJob};
use crate::queue::{JobQueue, RetryDecision};
use async_trait::async_trait;
use kerb_core::{QueueConfig, WorkerId};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Executes dequeued jobs.
///
/// Implementations must be cancellation-safe: a job future may be dropped
/// at any await point when its timeout fires or the pool shuts down.
#[async_trait]
pub trait JobExecutor: Send + Sync {
    /// Run one job to completion.
    async fn execute(&self, job: &ScanJob) -> std::result::Result<(), JobFailure>;

    /// Called once when a job fails for good, after its last attempt.
    async fn on_terminal_failure(&self, _job: &ScanJob) {}
}

/// Snapshot of worker occupancy.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PoolStatus {
    /// Workers currently executing a job
    pub active: usize,
    /// Workers waiting for work
    pub idle: usize,
    /// Target worker count
    pub total: usize,
}

/// Coarse health derived from live worker count versus target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolHealth {
    /// The pool has not been started or was stopped
    Stopped,
    /// The pool is running but no worker task is alive
    Unhealthy,
    /// Fewer than half of the target workers are alive
    Degraded,
    /// Enough workers are alive
    Healthy,
}

impl std::fmt::Display for PoolHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::Unhealthy => write!(f, "unhealthy"),
            Self::Degraded => write!(f, "degraded"),
            Self::Healthy => write!(f, "healthy"),
        }
    }
}

struct WorkerHandle {
    id: WorkerId,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

struct PoolInner {
    running: bool,
    target: usize,
    next_index: usize,
    workers: Vec<WorkerHandle>,
    tracker: TaskTracker,
    pool_token: CancellationToken,
}

/// Everything a worker task needs, bundled so spawning stays tidy.
struct WorkerContext {
    id: WorkerId,
    queue: Arc<JobQueue>,
    executor: Arc<dyn JobExecutor>,
    token: CancellationToken,
    poll_interval: Duration,
    site_timeout: Duration,
    active: Arc<AtomicUsize>,
    live: Arc<AtomicUsize>,
}

/// Pool of worker tasks polling the shared queue.
pub struct WorkerPool {
    queue: Arc<JobQueue>,
    executor: Arc<dyn JobExecutor>,
    config: QueueConfig,
    active: Arc<AtomicUsize>,
    live: Arc<AtomicUsize>,
    inner: Mutex<PoolInner>,
}

impl WorkerPool {
    /// Create a stopped pool over the given queue and executor.
    #[must_use]
    pub fn new(queue: Arc<JobQueue>, executor: Arc<dyn JobExecutor>, config: QueueConfig) -> Self {
        Self {
            queue,
            executor,
            config,
            active: Arc::new(AtomicUsize::new(0)),
            live: Arc::new(AtomicUsize::new(0)),
            inner: Mutex::new(PoolInner {
                running: false,
                target: 0,
                next_index: 0,
                workers: Vec::new(),
                tracker: TaskTracker::new(),
                pool_token: CancellationToken::new(),
            }),
        }
    }

    /// Spawn `count` workers plus the retention purge task.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    /// Returns `PoolAlreadyRunning` if the pool was already started.
    pub fn start(&self, count: usize) -> Result<()> {
        let mut inner = self.inner.lock().expect("acquire pool lock");
        if inner.running {
            return Err(QueueError::PoolAlreadyRunning);
        }

        inner.running = true;
        inner.target = count;
        inner.next_index = 0;
        inner.workers.clear();
        inner.tracker = TaskTracker::new();
        inner.pool_token = CancellationToken::new();
        self.active.store(0, Ordering::SeqCst);
        self.live.store(0, Ordering::SeqCst);

        for _ in 0..count {
            self.spawn_worker(&mut inner);
        }
        self.spawn_purge_task(&inner);

        info!(workers = count, "worker pool started");
        Ok(())
    }

    /// Stop all workers, waiting out the configured grace period.
    ///
    /// In-flight jobs get until the grace deadline to finish; after that
    /// their tasks are aborted and the queue retries them elsewhere.
    ///
    /// # Errors
    /// Returns `PoolNotRunning` if the pool is not started.
    pub async fn stop(&self) -> Result<()> {
        let (tracker, pool_token, workers) = {
            let mut inner = self.inner.lock().expect("acquire pool lock");
            if !inner.running {
                return Err(QueueError::PoolNotRunning);
            }
            inner.running = false;
            inner.target = 0;
            (
                std::mem::take(&mut inner.tracker),
                std::mem::take(&mut inner.pool_token),
                std::mem::take(&mut inner.workers),
            )
        };

        info!("stopping worker pool");
        pool_token.cancel();
        tracker.close();

        let grace = Duration::from_secs(self.config.shutdown_grace_secs);
        if tokio::time::timeout(grace, tracker.wait()).await.is_err() {
            warn!(
                grace_secs = self.config.shutdown_grace_secs,
                "grace period expired, aborting remaining workers"
            );
            for worker in &workers {
                worker.handle.abort();
            }
        }

        info!("worker pool stopped");
        Ok(())
    }

    /// Add or remove workers; returns the new target count.
    ///
    /// Scaling down cancels the newest workers after their current job.
    ///
    /// # Errors
    /// Returns `PoolNotRunning` if the pool is not started.
    pub fn scale(&self, delta: i64) -> Result<usize> {
        let mut inner = self.inner.lock().expect("acquire pool lock");
        if !inner.running {
            return Err(QueueError::PoolNotRunning);
        }

        if delta >= 0 {
            for _ in 0..delta {
                self.spawn_worker(&mut inner);
            }
        } else {
            let remove = usize::try_from(delta.unsigned_abs())
                .unwrap_or(usize::MAX)
                .min(inner.workers.len());
            for _ in 0..remove {
                if let Some(worker) = inner.workers.pop() {
                    worker.token.cancel();
                    debug!(worker = %worker.id, "descaling worker");
                }
            }
        }

        inner.target = inner.workers.len();
        info!(target = inner.target, "scaled worker pool");
        Ok(inner.target)
    }

    /// Current occupancy snapshot.
    #[must_use]
    pub fn status(&self) -> PoolStatus {
        let inner = self.inner.lock().expect("acquire pool lock");
        let active = self.active.load(Ordering::SeqCst);
        let total = inner.target;
        PoolStatus {
            active,
            idle: total.saturating_sub(active),
            total,
        }
    }

    /// Health derived from how many worker tasks are actually alive.
    #[must_use]
    pub fn health(&self) -> PoolHealth {
        let inner = self.inner.lock().expect("acquire pool lock");
        if !inner.running {
            return PoolHealth::Stopped;
        }
        let live = self.live.load(Ordering::SeqCst);
        if live == 0 {
            return PoolHealth::Unhealthy;
        }
        if live * 2 < inner.target {
            return PoolHealth::Degraded;
        }
        PoolHealth::Healthy
    }

    fn spawn_worker(&self, inner: &mut PoolInner) {
        let id = WorkerId::from_index(inner.next_index);
        inner.next_index += 1;

        let token = inner.pool_token.child_token();
        let ctx = WorkerContext {
            id: id.clone(),
            queue: Arc::clone(&self.queue),
            executor: Arc::clone(&self.executor),
            token: token.clone(),
            poll_interval: Duration::from_millis(self.config.poll_interval_ms),
            site_timeout: Duration::from_secs(self.config.site_job_timeout_secs),
            active: Arc::clone(&self.active),
            live: Arc::clone(&self.live),
        };
        let handle = inner.tracker.spawn(worker_loop(ctx));
        inner.workers.push(WorkerHandle { id, token, handle });
    }

    fn spawn_purge_task(&self, inner: &PoolInner) {
        let queue = Arc::clone(&self.queue);
        let token = inner.pool_token.clone();
        let interval = Duration::from_secs(self.config.purge_interval_secs);
        let retention = Duration::from_secs(self.config.retention_secs);

        inner.tracker.spawn(async move {
            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    () = tokio::time::sleep(interval) => {
                        let purged = queue.purge_terminal(retention);
                        if purged > 0 {
                            debug!(purged, "retention purge");
                        }
                    }
                }
            }
        });
    }
}

async fn worker_loop(ctx: WorkerContext) {
    ctx.live.fetch_add(1, Ordering::SeqCst);
    debug!(worker = %ctx.id, "worker started");

    loop {
        if ctx.token.is_cancelled() {
            break;
        }

        let Some(job) = ctx.queue.dequeue(&ctx.id) else {
            tokio::select! {
                () = ctx.token.cancelled() => break,
                () = tokio::time::sleep(ctx.poll_interval) => {}
            }
            continue;
        };

        ctx.active.fetch_add(1, Ordering::SeqCst);
        run_job(&ctx, &job).await;
        ctx.active.fetch_sub(1, Ordering::SeqCst);
    }

    ctx.live.fetch_sub(1, Ordering::SeqCst);
    debug!(worker = %ctx.id, "worker stopped");
}

async fn run_job(ctx: &WorkerContext, job: &ScanJob) {
    let timeout = match &job.payload {
        JobPayload::PageScan { timeout_secs, .. } => Duration::from_secs(*timeout_secs),
        JobPayload::SiteOrchestration { .. } => ctx.site_timeout,
    };

    debug!(worker = %ctx.id, job_id = %job.id, kind = %job.kind(), "executing job");

    let outcome = match tokio::time::timeout(timeout, ctx.executor.execute(job)).await {
        Ok(result) => result,
        Err(_) => Err(JobFailure::retryable(format!(
            "job timed out after {}s",
            timeout.as_secs()
        ))),
    };

    match outcome {
        Ok(()) => {
            if let Err(error) = ctx.queue.complete(&job.id) {
                warn!(job_id = %job.id, %error, "failed to record completion");
            }
        }
        Err(failure) => match ctx.queue.fail(&job.id, &failure) {
            Ok(RetryDecision::Retry { delay }) => {
                debug!(job_id = %job.id, delay_secs = delay.as_secs(), "job scheduled for retry");
            }
            Ok(RetryDecision::Terminal) => {
                ctx.executor.on_terminal_failure(job).await;
            }
            Err(error) => {
                warn!(job_id = %job.id, %error, "failed to record job failure");
            }
        },
    }
}
