//! Registry of scans known to the orchestrator.
//!
//! One [`ScanHandle`] per scan carries the live state machine: current
//! state, page accounting, the cancellation token and the progress sender.
//! The registry itself is a plain table; construct it once at application
//! startup and pass it to the orchestrator rather than reaching for any
//! process-wide state.

use crate::progress::ProgressEvent;
use chrono::{DateTime, Utc};
use kerb_core::{JobId, ScanConfig, ScanId, ScanState, SiteId};
use kerb_report::{PageResult, ScanResult};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Point-in-time view of one scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanSnapshot {
    /// The scan being described
    pub scan_id: ScanId,
    /// The site it audits
    pub site_id: SiteId,
    /// Crawl entry point
    pub base_url: String,
    /// Current lifecycle state
    pub state: ScanState,
    /// Pages found by the crawl (0 until discovery finishes)
    pub pages_discovered: usize,
    /// Pages scanned so far
    pub pages_scanned: usize,
    /// Pages that terminally failed so far
    pub pages_failed: usize,
    /// When the scan was accepted
    pub started_at: DateTime<Utc>,
    /// When the scan reached a terminal state
    pub finished_at: Option<DateTime<Utc>>,
    /// Cause of death for failed scans
    pub error: Option<String>,
}

/// Mutable accounting for one scan, guarded by the handle's lock.
struct Accounting {
    state: ScanState,
    pages_discovered: usize,
    pages_scanned: usize,
    pages_failed: usize,
    /// Page jobs this scan is waiting on
    expected: usize,
    /// Page jobs that reached a terminal outcome (result recorded or
    /// cancelled before dispatch)
    settled: usize,
    site_job: Option<JobId>,
    page_jobs: Vec<JobId>,
    pages: Vec<PageResult>,
    result: Option<ScanResult>,
    error: Option<String>,
    finished_at: Option<DateTime<Utc>>,
}

/// Live state for one scan.
///
/// Workers and the orchestrator share a handle through an `Arc`; all
/// mutation happens in short critical sections under an internal lock,
/// with waiters parked on a [`Notify`] rather than polling.
pub struct ScanHandle {
    scan_id: ScanId,
    site_id: SiteId,
    base_url: String,
    config: ScanConfig,
    started_at: DateTime<Utc>,
    cancel_token: CancellationToken,
    progress: Mutex<Option<mpsc::Sender<ProgressEvent>>>,
    wake: Notify,
    inner: Mutex<Accounting>,
}

impl ScanHandle {
    pub(crate) fn new(
        scan_id: ScanId,
        site_id: SiteId,
        base_url: impl Into<String>,
        config: ScanConfig,
        progress: mpsc::Sender<ProgressEvent>,
    ) -> Self {
        Self {
            scan_id,
            site_id,
            base_url: base_url.into(),
            config,
            started_at: Utc::now(),
            cancel_token: CancellationToken::new(),
            progress: Mutex::new(Some(progress)),
            wake: Notify::new(),
            inner: Mutex::new(Accounting {
                state: ScanState::Queued,
                pages_discovered: 0,
                pages_scanned: 0,
                pages_failed: 0,
                expected: 0,
                settled: 0,
                site_job: None,
                page_jobs: Vec::new(),
                pages: Vec::new(),
                result: None,
                error: None,
                finished_at: None,
            }),
        }
    }

    /// The scan this handle tracks.
    #[must_use]
    pub fn scan_id(&self) -> &ScanId {
        &self.scan_id
    }

    /// The site being scanned.
    #[must_use]
    pub fn site_id(&self) -> &SiteId {
        &self.site_id
    }

    /// The crawl entry point.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The configuration the scan runs under.
    #[must_use]
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// When the scan was accepted.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ScanState {
        self.inner.lock().expect("acquire scan state lock").state
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// A point-in-time copy of the scan's visible state.
    #[must_use]
    pub fn snapshot(&self) -> ScanSnapshot {
        let inner = self.inner.lock().expect("acquire scan state lock");
        ScanSnapshot {
            scan_id: self.scan_id.clone(),
            site_id: self.site_id.clone(),
            base_url: self.base_url.clone(),
            state: inner.state,
            pages_discovered: inner.pages_discovered,
            pages_scanned: inner.pages_scanned,
            pages_failed: inner.pages_failed,
            started_at: self.started_at,
            finished_at: inner.finished_at,
            error: inner.error.clone(),
        }
    }

    /// The final result, present once the scan completed.
    #[must_use]
    pub fn result(&self) -> Option<ScanResult> {
        self.inner.lock().expect("acquire scan state lock").result.clone()
    }

    /// Wait until the scan reaches a terminal state.
    pub async fn wait_terminal(&self) {
        loop {
            let notified = self.wake.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.state().is_terminal() {
                return;
            }
            notified.await;
        }
    }

    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.cancel_token
    }

    /// Flag the scan as cancelled. Jobs already running finish naturally.
    pub(crate) fn cancel(&self) {
        self.cancel_token.cancel();
        self.wake.notify_waiters();
    }

    /// Move to `next` unless the scan is already terminal.
    ///
    /// Returns whether the transition happened; a false return means some
    /// other path finished the scan first.
    pub(crate) fn transition(&self, next: ScanState) -> bool {
        let mut inner = self.inner.lock().expect("acquire scan state lock");
        if inner.state.is_terminal() {
            return false;
        }
        inner.state = next;
        if next.is_terminal() {
            inner.finished_at = Some(Utc::now());
        }
        drop(inner);
        debug!(scan_id = %self.scan_id, state = %next, "scan state changed");
        self.wake.notify_waiters();
        true
    }

    pub(crate) fn set_site_job(&self, job_id: JobId) {
        self.inner.lock().expect("acquire scan state lock").site_job = Some(job_id);
    }

    pub(crate) fn site_job(&self) -> Option<JobId> {
        self.inner.lock().expect("acquire scan state lock").site_job.clone()
    }

    pub(crate) fn record_job(&self, job_id: JobId) {
        self.inner.lock().expect("acquire scan state lock").page_jobs.push(job_id);
    }

    pub(crate) fn page_jobs(&self) -> Vec<JobId> {
        self.inner.lock().expect("acquire scan state lock").page_jobs.clone()
    }

    /// Record the discovered page set size; the scan now waits for exactly
    /// this many page jobs to settle.
    pub(crate) fn set_discovered(&self, count: usize) {
        let mut inner = self.inner.lock().expect("acquire scan state lock");
        inner.pages_discovered = count;
        inner.expected = count;
        drop(inner);
        self.wake.notify_waiters();
    }

    /// Shrink the awaited job count after an interrupted fan-out.
    pub(crate) fn set_expected(&self, count: usize) {
        self.inner.lock().expect("acquire scan state lock").expected = count;
        self.wake.notify_waiters();
    }

    /// Record one page outcome and emit its progress event.
    ///
    /// The event is queued before waiters are woken, so the per-page event
    /// always precedes the state transition that follows the last page.
    pub(crate) async fn record_page(&self, page: PageResult) {
        let event = {
            let mut inner = self.inner.lock().expect("acquire scan state lock");
            if page.is_failed() {
                inner.pages_failed += 1;
            } else {
                inner.pages_scanned += 1;
            }
            inner.settled += 1;
            let event = ProgressEvent {
                scan_id: self.scan_id.clone(),
                state: inner.state,
                pages_discovered: inner.pages_discovered,
                pages_scanned: inner.pages_scanned,
                pages_failed: inner.pages_failed,
                current_url: Some(page.url.clone()),
                message: page.error.clone(),
            };
            inner.pages.push(page);
            event
        };
        self.send_event(event).await;
        self.wake.notify_waiters();
    }

    /// Settle page jobs that were cancelled before any worker took them.
    pub(crate) fn settle_cancelled(&self, count: usize) {
        self.inner.lock().expect("acquire scan state lock").settled += count;
        self.wake.notify_waiters();
    }

    pub(crate) fn is_settled(&self) -> bool {
        let inner = self.inner.lock().expect("acquire scan state lock");
        inner.settled >= inner.expected
    }

    /// Wait until every awaited page job has settled.
    pub(crate) async fn wait_settled(&self) {
        loop {
            let notified = self.wake.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_settled() {
                return;
            }
            notified.await;
        }
    }

    pub(crate) fn take_pages(&self) -> Vec<PageResult> {
        std::mem::take(&mut self.inner.lock().expect("acquire scan state lock").pages)
    }

    pub(crate) fn store_result(&self, result: ScanResult) {
        self.inner.lock().expect("acquire scan state lock").result = Some(result);
    }

    pub(crate) fn set_error(&self, message: impl Into<String>) {
        self.inner.lock().expect("acquire scan state lock").error = Some(message.into());
    }

    pub(crate) fn pages_discovered(&self) -> usize {
        self.inner.lock().expect("acquire scan state lock").pages_discovered
    }

    /// Emit a progress event reflecting the scan's current state.
    pub(crate) async fn emit_progress(&self, current_url: Option<String>, message: Option<String>) {
        let event = {
            let inner = self.inner.lock().expect("acquire scan state lock");
            ProgressEvent {
                scan_id: self.scan_id.clone(),
                state: inner.state,
                pages_discovered: inner.pages_discovered,
                pages_scanned: inner.pages_scanned,
                pages_failed: inner.pages_failed,
                current_url,
                message,
            }
        };
        self.send_event(event).await;
    }

    /// Drop the progress sender; the consumer drains what is buffered and
    /// exits. Emissions after this are silently skipped.
    pub(crate) fn close_progress(&self) {
        self.progress.lock().expect("acquire progress lock").take();
    }

    async fn send_event(&self, event: ProgressEvent) {
        let sender = self.progress.lock().expect("acquire progress lock").clone();
        let Some(sender) = sender else {
            return;
        };
        if let Err(error) = sender.send(event).await {
            debug!(scan_id = %self.scan_id, %error, "progress consumer gone");
        }
    }
}

/// Table of scans, keyed by scan ID.
///
/// Entries stay after a scan finishes so status and results remain
/// queryable; the embedding application removes them when it is done.
pub struct ScanRegistry {
    scans: RwLock<HashMap<ScanId, Arc<ScanHandle>>>,
}

impl ScanRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            scans: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) fn insert(&self, handle: Arc<ScanHandle>) {
        self.scans
            .write()
            .expect("acquire scan registry lock")
            .insert(handle.scan_id().clone(), handle);
    }

    /// Look up a scan.
    #[must_use]
    pub fn get(&self, scan_id: &ScanId) -> Option<Arc<ScanHandle>> {
        self.scans
            .read()
            .expect("acquire scan registry lock")
            .get(scan_id)
            .cloned()
    }

    /// Remove a scan from the table, returning its handle.
    pub fn remove(&self, scan_id: &ScanId) -> Option<Arc<ScanHandle>> {
        self.scans
            .write()
            .expect("acquire scan registry lock")
            .remove(scan_id)
    }

    /// Snapshots of every known scan, newest first.
    #[must_use]
    pub fn snapshots(&self) -> Vec<ScanSnapshot> {
        let mut snapshots: Vec<ScanSnapshot> = self
            .scans
            .read()
            .expect("acquire scan registry lock")
            .values()
            .map(|handle| handle.snapshot())
            .collect();
        snapshots.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        snapshots
    }

    /// How many scans have not reached a terminal state.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.scans
            .read()
            .expect("acquire scan registry lock")
            .values()
            .filter(|handle| !handle.state().is_terminal())
            .count()
    }
}

impl Default for ScanRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn handle() -> (Arc<ScanHandle>, mpsc::Receiver<ProgressEvent>) {
        let (tx, rx) = mpsc::channel(16);
        let handle = Arc::new(ScanHandle::new(
            ScanId::generate(),
            SiteId::new("test-site").expect("valid site ID"),
            "https://site.test/",
            ScanConfig::default(),
            tx,
        ));
        (handle, rx)
    }

    #[tokio::test]
    async fn test_new_handle_is_queued() {
        let (handle, _rx) = handle();
        assert_eq!(handle.state(), ScanState::Queued);
        assert!(!handle.is_cancelled());
        assert!(handle.result().is_none());
        assert!(handle.snapshot().finished_at.is_none());
    }

    #[tokio::test]
    async fn test_transition_stops_at_terminal() {
        let (handle, _rx) = handle();
        assert!(handle.transition(ScanState::Crawling));
        assert!(handle.transition(ScanState::Failed));
        assert!(handle.snapshot().finished_at.is_some());

        // A terminal scan never moves again.
        assert!(!handle.transition(ScanState::Completed));
        assert_eq!(handle.state(), ScanState::Failed);
    }

    #[tokio::test]
    async fn test_record_page_counts_and_emits() {
        let (handle, mut rx) = handle();
        handle.transition(ScanState::Scanning);
        handle.set_discovered(2);

        handle
            .record_page(PageResult::scanned("https://site.test/", None, Some(200), 5, vec![]))
            .await;
        handle
            .record_page(PageResult::failed("https://site.test/broken", "connection reset"))
            .await;

        let snapshot = handle.snapshot();
        assert_eq!(snapshot.pages_scanned, 1);
        assert_eq!(snapshot.pages_failed, 1);
        assert!(handle.is_settled());

        let first = rx.recv().await.expect("first event");
        assert_eq!(first.pages_scanned, 1);
        assert_eq!(first.current_url.as_deref(), Some("https://site.test/"));
        let second = rx.recv().await.expect("second event");
        assert_eq!(second.pages_failed, 1);
        assert_eq!(second.message.as_deref(), Some("connection reset"));
    }

    #[tokio::test]
    async fn test_wait_settled_wakes_on_last_page() {
        let (handle, mut rx) = handle();
        handle.set_discovered(3);
        // Keep the channel drained so page emissions never block.
        tokio::spawn(async move { while rx.recv().await.is_some() {} });

        let waiter = {
            let handle = Arc::clone(&handle);
            tokio::spawn(async move {
                handle.wait_settled().await;
            })
        };

        for i in 0..3 {
            assert!(!waiter.is_finished());
            handle
                .record_page(PageResult::scanned(
                    format!("https://site.test/p{i}"),
                    None,
                    Some(200),
                    1,
                    vec![],
                ))
                .await;
        }

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter wakes")
            .expect("waiter task");
    }

    #[tokio::test]
    async fn test_settle_cancelled_counts_toward_expected() {
        let (handle, _rx) = handle();
        handle.set_discovered(4);
        handle
            .record_page(PageResult::scanned("https://site.test/", None, Some(200), 1, vec![]))
            .await;
        assert!(!handle.is_settled());

        handle.settle_cancelled(3);
        assert!(handle.is_settled());
        // Cancelled jobs are neither scanned nor failed.
        let snapshot = handle.snapshot();
        assert_eq!(snapshot.pages_scanned + snapshot.pages_failed, 1);
    }

    #[tokio::test]
    async fn test_wait_terminal_sees_transition() {
        let (handle, _rx) = handle();
        let waiter = {
            let handle = Arc::clone(&handle);
            tokio::spawn(async move {
                handle.wait_terminal().await;
                handle.state()
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.transition(ScanState::Cancelled);

        let state = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter wakes")
            .expect("waiter task");
        assert_eq!(state, ScanState::Cancelled);
    }

    #[tokio::test]
    async fn test_emission_after_close_is_skipped() {
        let (handle, mut rx) = handle();
        handle.close_progress();
        handle.emit_progress(None, None).await;
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_registry_insert_get_remove() {
        let registry = ScanRegistry::new();
        let (handle, _rx) = handle();
        let scan_id = handle.scan_id().clone();

        registry.insert(Arc::clone(&handle));
        assert!(registry.get(&scan_id).is_some());
        assert_eq!(registry.active_count(), 1);

        handle.transition(ScanState::Completed);
        assert_eq!(registry.active_count(), 0);
        assert_eq!(registry.snapshots().len(), 1);

        assert!(registry.remove(&scan_id).is_some());
        assert!(registry.get(&scan_id).is_none());
    }
}
