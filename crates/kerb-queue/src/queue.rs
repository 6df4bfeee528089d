//! Priority job queue with retry, backpressure and retention.

use crate::error::{QueueError, Result};
use crate::job::{JobFailure, JobStatus, ScanJob};
use chrono::Utc;
use kerb_core::{JobId, QueueConfig, WorkerId};
use serde::Serialize;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// What the queue decided after a failure report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// The job re-enters the pending set after the given delay
    Retry {
        /// Backoff before the job becomes dequeuable again
        delay: Duration,
    },
    /// The job is failed for good
    Terminal,
}

/// Point-in-time queue counters.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct QueueStats {
    /// Jobs ready to be dequeued
    pub pending: usize,
    /// Jobs waiting out a retry backoff
    pub delayed: usize,
    /// Jobs currently executing
    pub running: usize,
    /// Jobs that finished successfully
    pub completed: usize,
    /// Jobs that exhausted their attempts
    pub failed: usize,
    /// Jobs cancelled before dispatch
    pub cancelled: usize,
    /// Jobs admitted since the queue was created
    pub total_enqueued: u64,
}

/// Heap entry ordered by (priority descending, sequence ascending).
///
/// The sequence number is a monotonic counter, never wall-clock time, so
/// equal-priority jobs dequeue in exact admission order.
#[derive(Debug)]
struct PendingEntry {
    priority: crate::job::JobPriority,
    seq: u64,
    job_id: JobId,
}

impl Ord for PendingEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for PendingEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for PendingEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for PendingEntry {}

#[derive(Debug)]
struct DelayedEntry {
    ready_at: Instant,
    job_id: JobId,
}

#[derive(Default)]
struct QueueInner {
    jobs: HashMap<JobId, ScanJob>,
    pending: BinaryHeap<PendingEntry>,
    delayed: Vec<DelayedEntry>,
    terminal_at: HashMap<JobId, Instant>,
    next_seq: u64,
    total_enqueued: u64,
}

/// The shared, serialized job queue.
///
/// All methods are synchronous with short critical sections; workers call
/// them from async context without holding the lock across awaits. Status
/// transitions happen only here, so no two workers can ever receive the
/// same job.
pub struct JobQueue {
    inner: Mutex<QueueInner>,
    capacity: usize,
    backoff_base: Duration,
    backoff_cap: Duration,
}

impl JobQueue {
    /// Create a queue from configuration.
    #[must_use]
    pub fn new(config: &QueueConfig) -> Self {
        Self {
            inner: Mutex::new(QueueInner::default()),
            capacity: config.max_size,
            backoff_base: Duration::from_secs(config.backoff_base_secs),
            backoff_cap: Duration::from_secs(config.backoff_cap_secs),
        }
    }

    /// Admit a job.
    ///
    /// # Errors
    /// Returns `Full` when the pending set is at capacity; the queue is
    /// left untouched. Retried jobs re-enter via the delayed set and are
    /// exempt from this check (admission already happened).
    pub fn enqueue(&self, mut job: ScanJob) -> Result<JobId> {
        let mut guard = self.inner.lock().expect("acquire queue lock");
        let inner = &mut *guard;
        promote_due(inner, Instant::now());

        if inner.pending.len() >= self.capacity {
            return Err(QueueError::Full {
                capacity: self.capacity,
            });
        }

        job.status = JobStatus::Pending;
        job.updated_at = Utc::now();
        let job_id = job.id.clone();

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.total_enqueued += 1;
        inner.pending.push(PendingEntry {
            priority: job.priority,
            seq,
            job_id: job_id.clone(),
        });
        inner.jobs.insert(job_id.clone(), job);

        debug!(job_id = %job_id, "enqueued job");
        Ok(job_id)
    }

    /// Hand the highest-priority pending job to a worker.
    ///
    /// Atomically transitions the job pending to running under the queue
    /// lock. Returns `None` when nothing is ready.
    pub fn dequeue(&self, worker: &WorkerId) -> Option<ScanJob> {
        let mut guard = self.inner.lock().expect("acquire queue lock");
        let inner = &mut *guard;
        promote_due(inner, Instant::now());

        while let Some(entry) = inner.pending.pop() {
            let Some(job) = inner.jobs.get_mut(&entry.job_id) else {
                // Purged while queued; skip the stale entry.
                continue;
            };
            if job.status != JobStatus::Pending {
                // Cancelled while queued; skip the stale entry.
                continue;
            }

            job.status = JobStatus::Running;
            job.assigned_worker = Some(worker.clone());
            job.updated_at = Utc::now();
            debug!(job_id = %job.id, worker = %worker, "dequeued job");
            return Some(job.clone());
        }

        None
    }

    /// Mark a running job as completed.
    pub fn complete(&self, job_id: &JobId) -> Result<()> {
        let mut guard = self.inner.lock().expect("acquire queue lock");
        let inner = &mut *guard;

        let job = inner.jobs.get_mut(job_id).ok_or_else(|| QueueError::NotFound {
            job_id: job_id.to_string(),
        })?;

        if job.status != JobStatus::Running {
            return Err(QueueError::InvalidTransition {
                job_id: job_id.to_string(),
                status: job.status.to_string(),
                action: "complete".to_string(),
            });
        }

        job.status = JobStatus::Completed;
        job.updated_at = Utc::now();
        inner.terminal_at.insert(job_id.clone(), Instant::now());

        debug!(job_id = %job_id, "job completed");
        Ok(())
    }

    /// Report a running job's failure and decide its fate.
    ///
    /// A retryable failure with attempts remaining schedules the job into
    /// the delayed set with exponential backoff; anything else is terminal.
    pub fn fail(&self, job_id: &JobId, failure: &JobFailure) -> Result<RetryDecision> {
        let mut guard = self.inner.lock().expect("acquire queue lock");
        let inner = &mut *guard;

        let job = inner.jobs.get_mut(job_id).ok_or_else(|| QueueError::NotFound {
            job_id: job_id.to_string(),
        })?;

        if job.status != JobStatus::Running {
            return Err(QueueError::InvalidTransition {
                job_id: job_id.to_string(),
                status: job.status.to_string(),
                action: "fail".to_string(),
            });
        }

        let delay = job.backoff_delay(self.backoff_base, self.backoff_cap);
        job.attempt += 1;
        job.last_error = Some(failure.message.clone());
        job.updated_at = Utc::now();
        job.assigned_worker = None;
        let attempt = job.attempt;

        if !failure.retryable || attempt >= job.max_attempts {
            job.status = JobStatus::Failed;
            inner.terminal_at.insert(job_id.clone(), Instant::now());
            warn!(
                job_id = %job_id,
                attempt,
                "job terminally failed: {}",
                failure.message
            );
            return Ok(RetryDecision::Terminal);
        }

        job.status = JobStatus::Pending;
        inner.delayed.push(DelayedEntry {
            ready_at: Instant::now() + delay,
            job_id: job_id.clone(),
        });
        warn!(
            job_id = %job_id,
            attempt,
            delay_secs = delay.as_secs(),
            "job failed, will retry: {}",
            failure.message
        );
        Ok(RetryDecision::Retry { delay })
    }

    /// Cancel a job that has not been dispatched yet.
    ///
    /// Returns `true` if the job was pending and is now cancelled. A
    /// running job is left alone (`false`); it finishes naturally so the
    /// renderer resource is never leaked.
    pub fn cancel(&self, job_id: &JobId) -> Result<bool> {
        let mut guard = self.inner.lock().expect("acquire queue lock");
        let inner = &mut *guard;

        let job = inner.jobs.get_mut(job_id).ok_or_else(|| QueueError::NotFound {
            job_id: job_id.to_string(),
        })?;

        match job.status {
            JobStatus::Pending => {
                job.status = JobStatus::Cancelled;
                job.updated_at = Utc::now();
                inner.delayed.retain(|entry| &entry.job_id != job_id);
                inner.terminal_at.insert(job_id.clone(), Instant::now());
                debug!(job_id = %job_id, "cancelled pending job");
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Look up a job's current state.
    pub fn status(&self, job_id: &JobId) -> Result<ScanJob> {
        let guard = self.inner.lock().expect("acquire queue lock");
        guard
            .jobs
            .get(job_id)
            .cloned()
            .ok_or_else(|| QueueError::NotFound {
                job_id: job_id.to_string(),
            })
    }

    /// Current queue counters.
    #[must_use]
    pub fn stats(&self) -> QueueStats {
        let mut guard = self.inner.lock().expect("acquire queue lock");
        let inner = &mut *guard;
        promote_due(inner, Instant::now());

        let mut stats = QueueStats {
            delayed: inner.delayed.len(),
            total_enqueued: inner.total_enqueued,
            ..QueueStats::default()
        };

        for job in inner.jobs.values() {
            match job.status {
                JobStatus::Pending => stats.pending += 1,
                JobStatus::Running => stats.running += 1,
                JobStatus::Completed => stats.completed += 1,
                JobStatus::Failed => stats.failed += 1,
                JobStatus::Cancelled => stats.cancelled += 1,
            }
        }
        // Delayed jobs carry pending status; report them separately.
        stats.pending = stats.pending.saturating_sub(stats.delayed);

        stats
    }

    /// Drop terminal jobs older than `max_age`; returns how many went.
    pub fn purge_terminal(&self, max_age: Duration) -> usize {
        let now = Instant::now();
        let mut guard = self.inner.lock().expect("acquire queue lock");
        let inner = &mut *guard;

        let expired: Vec<JobId> = inner
            .terminal_at
            .iter()
            .filter(|(_, at)| now.duration_since(**at) >= max_age)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            inner.jobs.remove(id);
            inner.terminal_at.remove(id);
        }

        if !expired.is_empty() {
            debug!(purged = expired.len(), "purged terminal jobs");
        }
        expired.len()
    }
}

/// Move retry-delayed jobs whose backoff elapsed back into the heap.
///
/// Promoted jobs keep their priority but take a fresh sequence number.
fn promote_due(inner: &mut QueueInner, now: Instant) {
    if inner.delayed.is_empty() {
        return;
    }

    let delayed = std::mem::take(&mut inner.delayed);
    for entry in delayed {
        if entry.ready_at <= now {
            if let Some(job) = inner.jobs.get(&entry.job_id) {
                let seq = inner.next_seq;
                inner.next_seq += 1;
                inner.pending.push(PendingEntry {
                    priority: job.priority,
                    seq,
                    job_id: entry.job_id,
                });
            }
        } else {
            inner.delayed.push(entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{JobPayload, JobPriority};
    use kerb_core::ScanId;

    fn test_queue(max_size: usize, backoff_base_secs: u64) -> JobQueue {
        JobQueue::new(&QueueConfig {
            max_size,
            backoff_base_secs,
            ..QueueConfig::default()
        })
    }

    fn page_job(url: &str, priority: JobPriority, max_attempts: u32) -> ScanJob {
        ScanJob::new(
            JobPayload::PageScan {
                scan_id: ScanId::generate(),
                url: url.to_string(),
                checkers: vec!["axe".to_string()],
                timeout_secs: 60,
            },
            priority,
            max_attempts,
        )
    }

    fn worker() -> WorkerId {
        WorkerId::from_index(0)
    }

    #[test]
    fn test_enqueue_dequeue_complete() {
        let queue = test_queue(10, 2);
        let job_id = queue
            .enqueue(page_job("https://example.com/a", JobPriority::Normal, 3))
            .expect("enqueue");

        let job = queue.dequeue(&worker()).expect("job is ready");
        assert_eq!(job.id, job_id);
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.assigned_worker, Some(worker()));

        queue.complete(&job_id).expect("complete");
        let status = queue.status(&job_id).expect("status");
        assert_eq!(status.status, JobStatus::Completed);
    }

    #[test]
    fn test_dequeue_empty_queue() {
        let queue = test_queue(10, 2);
        assert!(queue.dequeue(&worker()).is_none());
    }

    #[test]
    fn test_priority_before_fifo() {
        let queue = test_queue(10, 2);
        let normal_1 = queue
            .enqueue(page_job("https://example.com/1", JobPriority::Normal, 1))
            .expect("enqueue");
        let urgent = queue
            .enqueue(page_job("https://example.com/2", JobPriority::Urgent, 1))
            .expect("enqueue");
        let normal_2 = queue
            .enqueue(page_job("https://example.com/3", JobPriority::Normal, 1))
            .expect("enqueue");

        assert_eq!(queue.dequeue(&worker()).expect("first").id, urgent);
        assert_eq!(queue.dequeue(&worker()).expect("second").id, normal_1);
        assert_eq!(queue.dequeue(&worker()).expect("third").id, normal_2);
    }

    #[test]
    fn test_fifo_within_equal_priority() {
        let queue = test_queue(10, 2);
        let ids: Vec<_> = (0..5)
            .map(|i| {
                queue
                    .enqueue(page_job(
                        &format!("https://example.com/{i}"),
                        JobPriority::Normal,
                        1,
                    ))
                    .expect("enqueue")
            })
            .collect();

        for expected in &ids {
            assert_eq!(&queue.dequeue(&worker()).expect("job").id, expected);
        }
    }

    #[test]
    fn test_queue_full_rejects_without_side_effects() {
        let queue = test_queue(2, 2);
        queue
            .enqueue(page_job("https://example.com/1", JobPriority::Normal, 1))
            .expect("enqueue");
        queue
            .enqueue(page_job("https://example.com/2", JobPriority::Normal, 1))
            .expect("enqueue");

        let err = queue
            .enqueue(page_job("https://example.com/3", JobPriority::Urgent, 1))
            .unwrap_err();
        assert!(matches!(err, QueueError::Full { capacity: 2 }));

        let stats = queue.stats();
        assert_eq!(stats.pending, 2);
        assert_eq!(stats.total_enqueued, 2);
    }

    #[test]
    fn test_retry_with_zero_backoff() {
        let queue = test_queue(10, 0);
        let job_id = queue
            .enqueue(page_job("https://example.com/flaky", JobPriority::Normal, 3))
            .expect("enqueue");

        let job = queue.dequeue(&worker()).expect("first attempt");
        let decision = queue
            .fail(&job.id, &JobFailure::retryable("render timed out"))
            .expect("fail");
        assert_eq!(
            decision,
            RetryDecision::Retry {
                delay: Duration::ZERO
            }
        );

        // Zero backoff means immediately dequeuable again
        let retried = queue.dequeue(&worker()).expect("retry attempt");
        assert_eq!(retried.id, job_id);
        assert_eq!(retried.attempt, 1);
        assert_eq!(
            retried.last_error.as_deref(),
            Some("render timed out")
        );
        // Payload survives the retry untouched
        match retried.payload {
            JobPayload::PageScan { ref url, .. } => {
                assert_eq!(url, "https://example.com/flaky");
            }
            ref other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_delayed_job_not_ready_before_backoff() {
        let queue = test_queue(10, 60);
        queue
            .enqueue(page_job("https://example.com/slow", JobPriority::Normal, 3))
            .expect("enqueue");

        let job = queue.dequeue(&worker()).expect("first attempt");
        let decision = queue
            .fail(&job.id, &JobFailure::retryable("boom"))
            .expect("fail");
        assert!(matches!(decision, RetryDecision::Retry { delay } if delay == Duration::from_secs(60)));

        assert!(queue.dequeue(&worker()).is_none());
        let stats = queue.stats();
        assert_eq!(stats.delayed, 1);
        assert_eq!(stats.pending, 0);
    }

    #[test]
    fn test_attempts_exhaust_to_terminal() {
        let queue = test_queue(10, 0);
        let job_id = queue
            .enqueue(page_job("https://example.com/down", JobPriority::Normal, 2))
            .expect("enqueue");

        let job = queue.dequeue(&worker()).expect("attempt 1");
        assert!(matches!(
            queue.fail(&job.id, &JobFailure::retryable("no route")).expect("fail"),
            RetryDecision::Retry { .. }
        ));

        let job = queue.dequeue(&worker()).expect("attempt 2");
        assert_eq!(job.attempt, 1);
        assert_eq!(
            queue.fail(&job.id, &JobFailure::retryable("no route")).expect("fail"),
            RetryDecision::Terminal
        );

        let status = queue.status(&job_id).expect("status");
        assert_eq!(status.status, JobStatus::Failed);
        assert_eq!(status.attempt, 2);
        assert!(queue.dequeue(&worker()).is_none());
    }

    #[test]
    fn test_fatal_failure_skips_remaining_attempts() {
        let queue = test_queue(10, 0);
        let job_id = queue
            .enqueue(page_job("https://example.com/bad", JobPriority::Normal, 5))
            .expect("enqueue");

        let job = queue.dequeue(&worker()).expect("attempt 1");
        let decision = queue
            .fail(&job.id, &JobFailure::fatal("scan was cancelled"))
            .expect("fail");

        assert_eq!(decision, RetryDecision::Terminal);
        assert_eq!(
            queue.status(&job_id).expect("status").status,
            JobStatus::Failed
        );
    }

    #[test]
    fn test_retried_job_keeps_priority() {
        let queue = test_queue(10, 0);
        let urgent = queue
            .enqueue(page_job("https://example.com/u", JobPriority::Urgent, 3))
            .expect("enqueue");

        let job = queue.dequeue(&worker()).expect("urgent job");
        queue
            .fail(&job.id, &JobFailure::retryable("hiccup"))
            .expect("fail");

        queue
            .enqueue(page_job("https://example.com/n", JobPriority::Normal, 1))
            .expect("enqueue");

        // The promoted retry outranks the fresh normal-priority job
        assert_eq!(queue.dequeue(&worker()).expect("job").id, urgent);
    }

    #[test]
    fn test_cancel_pending_job() {
        let queue = test_queue(10, 2);
        let job_id = queue
            .enqueue(page_job("https://example.com/x", JobPriority::Normal, 1))
            .expect("enqueue");

        assert!(queue.cancel(&job_id).expect("cancel"));
        assert_eq!(
            queue.status(&job_id).expect("status").status,
            JobStatus::Cancelled
        );
        // The stale heap entry must never be delivered
        assert!(queue.dequeue(&worker()).is_none());
    }

    #[test]
    fn test_cancel_running_job_is_refused() {
        let queue = test_queue(10, 2);
        let job_id = queue
            .enqueue(page_job("https://example.com/x", JobPriority::Normal, 1))
            .expect("enqueue");
        queue.dequeue(&worker()).expect("job");

        assert!(!queue.cancel(&job_id).expect("cancel"));
        assert_eq!(
            queue.status(&job_id).expect("status").status,
            JobStatus::Running
        );
    }

    #[test]
    fn test_cancel_delayed_job() {
        let queue = test_queue(10, 60);
        let job_id = queue
            .enqueue(page_job("https://example.com/x", JobPriority::Normal, 3))
            .expect("enqueue");
        let job = queue.dequeue(&worker()).expect("job");
        queue
            .fail(&job.id, &JobFailure::retryable("hiccup"))
            .expect("fail");

        assert!(queue.cancel(&job_id).expect("cancel"));
        let stats = queue.stats();
        assert_eq!(stats.delayed, 0);
        assert_eq!(stats.cancelled, 1);
    }

    #[test]
    fn test_complete_requires_running() {
        let queue = test_queue(10, 2);
        let job_id = queue
            .enqueue(page_job("https://example.com/x", JobPriority::Normal, 1))
            .expect("enqueue");

        let err = queue.complete(&job_id).unwrap_err();
        assert!(matches!(err, QueueError::InvalidTransition { .. }));
    }

    #[test]
    fn test_unknown_job_id() {
        let queue = test_queue(10, 2);
        let missing = JobId::generate();

        assert!(matches!(
            queue.status(&missing).unwrap_err(),
            QueueError::NotFound { .. }
        ));
        assert!(matches!(
            queue.complete(&missing).unwrap_err(),
            QueueError::NotFound { .. }
        ));
    }

    #[test]
    fn test_stats_across_states() {
        let queue = test_queue(10, 0);
        let a = queue
            .enqueue(page_job("https://example.com/a", JobPriority::Normal, 1))
            .expect("enqueue");
        let b = queue
            .enqueue(page_job("https://example.com/b", JobPriority::Normal, 1))
            .expect("enqueue");
        queue
            .enqueue(page_job("https://example.com/c", JobPriority::Normal, 1))
            .expect("enqueue");

        let job_a = queue.dequeue(&worker()).expect("a");
        assert_eq!(job_a.id, a);
        queue.complete(&a).expect("complete");

        let job_b = queue.dequeue(&worker()).expect("b");
        assert_eq!(job_b.id, b);

        let stats = queue.stats();
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.running, 1);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.total_enqueued, 3);
    }

    #[test]
    fn test_purge_terminal_jobs() {
        let queue = test_queue(10, 2);
        let done = queue
            .enqueue(page_job("https://example.com/done", JobPriority::Normal, 1))
            .expect("enqueue");
        queue
            .enqueue(page_job("https://example.com/waiting", JobPriority::Normal, 1))
            .expect("enqueue");

        let job = queue.dequeue(&worker()).expect("job");
        assert_eq!(job.id, done);
        queue.complete(&done).expect("complete");

        // Nothing old enough yet
        assert_eq!(queue.purge_terminal(Duration::from_secs(3600)), 0);
        // Zero retention purges every terminal job
        assert_eq!(queue.purge_terminal(Duration::ZERO), 1);

        assert!(matches!(
            queue.status(&done).unwrap_err(),
            QueueError::NotFound { .. }
        ));
        // The pending job is untouched
        assert_eq!(queue.stats().pending, 1);
    }
}
