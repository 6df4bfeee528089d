//! End-to-end scan flows over an in-memory fake site.

use async_trait::async_trait;
use kerb_browser::{ChromiumRenderer, PageHandle, RenderError, RenderedPage, Renderer};
use kerb_checker::{Checker, CheckerRegistry, Finding};
use kerb_core::{BrowserConfig, QueueConfig, ScanConfig, ScanState, Severity, SiteId};
use kerb_report::ComplianceBand;
use kerb_scanner::{ScanError, ScanOrchestrator, ScanRegistry};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("KERB_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Fake site: URL -> outgoing links, with a set of URLs that always fail.
///
/// URLs not in the map render fine with no links, so only pages with
/// outgoing links need an entry. `open_pages` balances every `load`
/// against its `close` to catch leaked page handles.
struct FakeSite {
    pages: HashMap<String, Vec<String>>,
    broken: HashSet<String>,
    next_handle: AtomicU64,
    open_pages: AtomicI64,
}

impl FakeSite {
    fn new(pages: &[(&str, &[&str])], broken: &[&str]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|(url, links)| {
                    (
                        (*url).to_string(),
                        links.iter().map(|l| (*l).to_string()).collect(),
                    )
                })
                .collect(),
            broken: broken.iter().map(|u| (*u).to_string()).collect(),
            next_handle: AtomicU64::new(1),
            open_pages: AtomicI64::new(0),
        }
    }

    fn open_pages(&self) -> i64 {
        self.open_pages.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Renderer for FakeSite {
    async fn load(&self, url: &str) -> kerb_browser::Result<RenderedPage> {
        if self.broken.contains(url) {
            return Err(RenderError::Navigation {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        self.open_pages.fetch_add(1, Ordering::SeqCst);
        Ok(RenderedPage {
            handle: PageHandle(self.next_handle.fetch_add(1, Ordering::SeqCst)),
            url: url.to_string(),
            title: Some("Fake page".to_string()),
            status_code: Some(200),
            html: "<html><body><main>content</main></body></html>".to_string(),
            links: self.pages.get(url).cloned().unwrap_or_default(),
            load_time_ms: 2,
        })
    }

    async fn close(&self, _page: RenderedPage) {
        self.open_pages.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A checker that reports the same findings on every page.
struct FixedChecker {
    name: &'static str,
    findings: Vec<Finding>,
}

#[async_trait]
impl Checker for FixedChecker {
    fn name(&self) -> &str {
        self.name
    }

    async fn run(&self, _page: &RenderedPage) -> kerb_checker::Result<Vec<Finding>> {
        Ok(self.findings.clone())
    }
}

/// Hermetic scan config: no sitemap or robots fetches, no retry delay.
fn scan_config(max_pages: usize) -> ScanConfig {
    ScanConfig {
        max_depth: 2,
        max_pages,
        checkers: vec!["axe".to_string()],
        concurrent_workers: 2,
        per_job_timeout_secs: 5,
        max_retries: 1,
        use_sitemap: false,
        respect_robots_txt: false,
        ..ScanConfig::default()
    }
}

fn queue_config() -> QueueConfig {
    QueueConfig {
        max_size: 100,
        backoff_base_secs: 0,
        poll_interval_ms: 10,
        shutdown_grace_secs: 5,
        ..QueueConfig::default()
    }
}

fn site_id() -> SiteId {
    SiteId::new("fake-site").expect("valid site ID")
}

fn orchestrator(site: Arc<FakeSite>, checkers: CheckerRegistry) -> ScanOrchestrator {
    ScanOrchestrator::new(site, checkers, Arc::new(ScanRegistry::new()), queue_config())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_full_scan_completes_and_scores() {
    init_tracing();
    let site = Arc::new(FakeSite::new(
        &[
            (
                "https://site.test/",
                &["https://site.test/about", "https://site.test/services"],
            ),
            ("https://site.test/about", &["https://site.test/contact"]),
        ],
        &[],
    ));
    let checkers = CheckerRegistry::new();
    checkers.register(Arc::new(FixedChecker {
        name: "axe",
        findings: vec![Finding::new(
            "image-alt",
            "Image missing alternative text",
            Severity::Critical,
            "img#hero",
            "axe",
        )],
    }));

    let orchestrator = orchestrator(Arc::clone(&site), checkers);
    orchestrator.start(3).expect("start pool");

    let scan_id = orchestrator
        .start_scan(site_id(), "https://site.test/", scan_config(10))
        .await
        .expect("start scan");
    let result = orchestrator
        .wait_for_result(&scan_id)
        .await
        .expect("scan result");

    assert_eq!(result.state, ScanState::Completed);
    assert_eq!(result.summary.pages_discovered, 4);
    assert_eq!(result.summary.pages_scanned, 4);
    assert_eq!(result.summary.pages_failed, 0);

    // One img#hero violation per page, all critical
    assert_eq!(result.violations.len(), 4);
    assert!(result
        .violations
        .iter()
        .all(|v| v.severity == Severity::Critical));
    let pages_flagged: HashSet<&str> = result
        .violations
        .iter()
        .map(|v| v.page_url.as_str())
        .collect();
    assert_eq!(pages_flagged.len(), 4);

    // Four critical/AA violations against a four-page budget
    assert_eq!(result.score.overall, 80.0);
    assert_eq!(result.score.band, ComplianceBand::NonCompliant);

    orchestrator.shutdown().await.expect("shutdown");
    // Every rendered page was closed again
    assert_eq!(site.open_pages(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_scan_tolerates_failing_pages() {
    init_tracing();
    let links: Vec<String> = (1..=9).map(|i| format!("https://site.test/p{i}")).collect();
    let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();
    let site = Arc::new(FakeSite::new(
        &[("https://site.test/", link_refs.as_slice())],
        &["https://site.test/p3", "https://site.test/p7"],
    ));
    let checkers = CheckerRegistry::new();
    checkers.register(Arc::new(FixedChecker {
        name: "axe",
        findings: Vec::new(),
    }));

    let orchestrator = orchestrator(Arc::clone(&site), checkers);
    orchestrator.start(3).expect("start pool");

    let scan_id = orchestrator
        .start_scan(site_id(), "https://site.test/", scan_config(10))
        .await
        .expect("start scan");
    let result = orchestrator
        .wait_for_result(&scan_id)
        .await
        .expect("scan result");

    // Unreachable pages degrade the scan, they do not fail it
    assert_eq!(result.state, ScanState::Completed);
    assert_eq!(result.summary.pages_discovered, 10);
    assert_eq!(result.summary.pages_scanned, 8);
    assert_eq!(result.summary.pages_failed, 2);
    assert_eq!(
        result.summary.pages_discovered,
        result.summary.pages_scanned + result.summary.pages_failed
    );

    let failed: Vec<&str> = result
        .pages
        .iter()
        .filter(|p| p.is_failed())
        .map(|p| p.url.as_str())
        .collect();
    assert_eq!(failed.len(), 2);
    assert!(failed.contains(&"https://site.test/p3"));
    assert!(failed.contains(&"https://site.test/p7"));
    assert!(result
        .pages
        .iter()
        .filter(|p| p.is_failed())
        .all(|p| p.error.is_some()));

    orchestrator.shutdown().await.expect("shutdown");
    assert_eq!(site.open_pages(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_findings_from_concurrent_checkers_merge() {
    init_tracing();
    let site = Arc::new(FakeSite::new(&[], &[]));
    let checkers = CheckerRegistry::new();
    checkers.register(Arc::new(FixedChecker {
        name: "axe",
        findings: vec![Finding::new(
            "image-alt",
            "Images must have alternate text",
            Severity::Critical,
            "img#hero",
            "axe",
        )],
    }));
    checkers.register(Arc::new(FixedChecker {
        name: "pa11y",
        findings: vec![Finding::new(
            "Image-Alt",
            "Img element missing an alt attribute",
            Severity::Serious,
            "img#hero",
            "pa11y",
        )],
    }));

    let orchestrator = orchestrator(site, checkers);
    orchestrator.start(2).expect("start pool");

    let config = ScanConfig {
        checkers: vec!["axe".to_string(), "pa11y".to_string()],
        ..scan_config(5)
    };
    let scan_id = orchestrator
        .start_scan(site_id(), "https://site.test/", config)
        .await
        .expect("start scan");
    let result = orchestrator
        .wait_for_result(&scan_id)
        .await
        .expect("scan result");

    // Both checkers flagged the same element; the report carries one
    // violation crediting both engines at the higher severity.
    assert_eq!(result.violations.len(), 1);
    let violation = &result.violations[0];
    assert_eq!(violation.detected_by, vec!["axe", "pa11y"]);
    assert_eq!(violation.severity, Severity::Critical);
    assert_eq!(result.score.band, ComplianceBand::NonCompliant);

    orchestrator.shutdown().await.expect("shutdown");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_bounded_queue_applies_backpressure() {
    init_tracing();
    let links: Vec<String> = (1..=7).map(|i| format!("https://site.test/q{i}")).collect();
    let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();
    let site = Arc::new(FakeSite::new(
        &[("https://site.test/", link_refs.as_slice())],
        &[],
    ));
    let checkers = CheckerRegistry::new();
    checkers.register(Arc::new(FixedChecker {
        name: "axe",
        findings: Vec::new(),
    }));

    // Pending capacity far below the page count: the fan-out must wait for
    // workers to drain the queue instead of failing.
    let queue_config = QueueConfig {
        max_size: 3,
        ..queue_config()
    };
    let orchestrator = ScanOrchestrator::new(
        site,
        checkers,
        Arc::new(ScanRegistry::new()),
        queue_config,
    );
    orchestrator.start(3).expect("start pool");

    let scan_id = orchestrator
        .start_scan(site_id(), "https://site.test/", scan_config(10))
        .await
        .expect("start scan");
    let result = orchestrator
        .wait_for_result(&scan_id)
        .await
        .expect("scan result");

    assert_eq!(result.state, ScanState::Completed);
    assert_eq!(result.summary.pages_discovered, 8);
    assert_eq!(result.summary.pages_scanned, 8);

    orchestrator.shutdown().await.expect("shutdown");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unknown_checker_degrades_not_fails() {
    init_tracing();
    let site = Arc::new(FakeSite::new(&[], &[]));
    // Nothing registered: every "axe" run is recorded as unavailable.
    let orchestrator = orchestrator(site, CheckerRegistry::new());
    orchestrator.start(2).expect("start pool");

    let scan_id = orchestrator
        .start_scan(site_id(), "https://site.test/", scan_config(5))
        .await
        .expect("start scan");
    let result = orchestrator
        .wait_for_result(&scan_id)
        .await
        .expect("scan result");

    assert_eq!(result.state, ScanState::Completed);
    assert_eq!(result.summary.pages_scanned, 1);
    let run = &result.pages[0].checker_runs[0];
    assert_eq!(run.checker, "axe");
    assert!(run.error.is_some());
    assert!(result.violations.is_empty());
    assert_eq!(result.score.overall, 100.0);

    orchestrator.shutdown().await.expect("shutdown");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_start_scan_after_shutdown_is_rejected() {
    init_tracing();
    let site = Arc::new(FakeSite::new(&[], &[]));
    let orchestrator = orchestrator(site, CheckerRegistry::new());
    orchestrator.start(2).expect("start pool");
    orchestrator.shutdown().await.expect("shutdown");

    let error = orchestrator
        .start_scan(site_id(), "https://site.test/", scan_config(5))
        .await
        .expect_err("pool is stopped");
    assert!(matches!(error, ScanError::NotRunning));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "Requires Chrome browser - run with --ignored"]
async fn test_live_chromium_scan() {
    init_tracing();
    let renderer = Arc::new(
        ChromiumRenderer::launch(&BrowserConfig::default())
            .await
            .expect("launch browser"),
    );
    let checkers = CheckerRegistry::new();
    checkers.register(Arc::new(FixedChecker {
        name: "axe",
        findings: Vec::new(),
    }));

    let orchestrator = ScanOrchestrator::new(
        renderer,
        checkers,
        Arc::new(ScanRegistry::new()),
        queue_config(),
    );
    orchestrator.start(3).expect("start pool");

    let scan_id = orchestrator
        .start_scan(
            SiteId::new("example-org").expect("valid site ID"),
            "https://example.org/",
            scan_config(3),
        )
        .await
        .expect("start scan");
    let result = orchestrator
        .wait_for_result(&scan_id)
        .await
        .expect("scan result");

    assert_eq!(result.state, ScanState::Completed);
    assert!(result.summary.pages_discovered >= 1);

    orchestrator.shutdown().await.expect("shutdown");
}
