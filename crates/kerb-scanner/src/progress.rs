//! Progress reporting for running scans.
//!
//! Events flow through a bounded channel per scan: the orchestrator and the
//! page workers write, and a single consumer task drains the channel and
//! awaits the caller's handler for every event. That gives in-order,
//! at-least-once delivery per scan without the scan's control flow ever
//! depending on how long the handler takes; a full channel slows the
//! producers down instead of dropping events.

use async_trait::async_trait;
use kerb_core::{ScanId, ScanState};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;

/// One progress update for one scan.
///
/// Emitted at every state transition and at every page completion.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    /// The scan this event belongs to
    pub scan_id: ScanId,
    /// State the scan was in when the event was emitted
    pub state: ScanState,
    /// Pages found by the crawl (0 until discovery finishes)
    pub pages_discovered: usize,
    /// Pages scanned so far
    pub pages_scanned: usize,
    /// Pages that terminally failed so far
    pub pages_failed: usize,
    /// The page that triggered this event, on per-page updates
    pub current_url: Option<String>,
    /// Extra detail, e.g. the cause of a failed scan
    pub message: Option<String>,
}

/// Receives progress events for scans started through the orchestrator.
///
/// Each scan gets its own consumer task that awaits `on_event` once per
/// event, so a slow handler delays later events for that scan but never
/// the scan itself.
#[async_trait]
pub trait ProgressHandler: Send + Sync {
    /// Called once per event, in emission order.
    async fn on_event(&self, event: ProgressEvent);
}

/// A handler that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgress;

#[async_trait]
impl ProgressHandler for NullProgress {
    async fn on_event(&self, _event: ProgressEvent) {}
}

struct FnProgress<F>(F);

#[async_trait]
impl<F> ProgressHandler for FnProgress<F>
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    async fn on_event(&self, event: ProgressEvent) {
        (self.0)(event);
    }
}

/// Wrap a synchronous closure as a [`ProgressHandler`].
pub fn from_fn<F>(f: F) -> Arc<dyn ProgressHandler>
where
    F: Fn(ProgressEvent) + Send + Sync + 'static,
{
    Arc::new(FnProgress(f))
}

/// Open a progress channel drained by a dedicated consumer task.
///
/// The consumer exits once every sender is dropped and the buffer is empty,
/// so buffered events still reach the handler after a scan ends.
pub(crate) fn channel(
    handler: Arc<dyn ProgressHandler>,
    capacity: usize,
) -> mpsc::Sender<ProgressEvent> {
    let (tx, mut rx) = mpsc::channel(capacity);
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            handler.on_event(event).await;
        }
    });
    tx
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn event(state: ScanState, scanned: usize) -> ProgressEvent {
        ProgressEvent {
            scan_id: ScanId::generate(),
            state,
            pages_discovered: 4,
            pages_scanned: scanned,
            pages_failed: 0,
            current_url: None,
            message: None,
        }
    }

    #[tokio::test]
    async fn test_from_fn_invokes_closure() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler = from_fn(move |event: ProgressEvent| {
            sink.lock().expect("acquire seen lock").push(event.state);
        });

        handler.on_event(event(ScanState::Crawling, 0)).await;
        handler.on_event(event(ScanState::Scanning, 1)).await;

        let seen = seen.lock().expect("acquire seen lock");
        assert_eq!(seen.as_slice(), &[ScanState::Crawling, ScanState::Scanning]);
    }

    #[tokio::test]
    async fn test_channel_preserves_order_and_drains_after_close() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let tx = channel(
            from_fn(move |event: ProgressEvent| {
                sink.lock().expect("acquire seen lock").push(event.pages_scanned);
            }),
            8,
        );

        for scanned in 0..5 {
            tx.send(event(ScanState::Scanning, scanned)).await.expect("send event");
        }
        drop(tx);

        // The consumer drains the buffer after the sender is gone.
        for _ in 0..100 {
            if seen.lock().expect("acquire seen lock").len() == 5 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        let seen = seen.lock().expect("acquire seen lock");
        assert_eq!(seen.as_slice(), &[0, 1, 2, 3, 4]);
    }
}
