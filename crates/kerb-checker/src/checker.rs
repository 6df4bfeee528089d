//! The unified checker interface.

use crate::error::Result;
use crate::finding::Finding;
use async_trait::async_trait;
use kerb_browser::RenderedPage;

/// One accessibility checking tool.
///
/// Implementations may inspect the snapshot in-process or hand the page to
/// an external tool; the orchestration core treats both identically and
/// never looks past this trait.
#[async_trait]
pub trait Checker: Send + Sync {
    /// Stable name used to select this checker in scan configuration.
    fn name(&self) -> &str;

    /// Inspect one rendered page and report every issue found.
    ///
    /// An empty list means the checker ran and found nothing. An error means
    /// it could not run or did not finish; the page is then recorded as
    /// partially checked rather than failed outright.
    async fn run(&self, page: &RenderedPage) -> Result<Vec<Finding>>;
}

#[cfg(test)]
impl std::fmt::Debug for dyn Checker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Checker").field("name", &self.name()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kerb_browser::PageHandle;
    use kerb_core::Severity;

    struct FixedChecker {
        findings: Vec<Finding>,
    }

    #[async_trait]
    impl Checker for FixedChecker {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn run(&self, _page: &RenderedPage) -> Result<Vec<Finding>> {
            Ok(self.findings.clone())
        }
    }

    fn blank_page() -> RenderedPage {
        RenderedPage {
            handle: PageHandle(1),
            url: "https://example.com/".to_string(),
            title: None,
            status_code: Some(200),
            html: String::new(),
            links: Vec::new(),
            load_time_ms: 0,
        }
    }

    #[tokio::test]
    async fn test_checker_trait_object() {
        let checker: Box<dyn Checker> = Box::new(FixedChecker {
            findings: vec![Finding::new(
                "image-alt",
                "Images must have alternate text",
                Severity::Critical,
                "img#hero",
                "fixed",
            )],
        });

        let findings = checker.run(&blank_page()).await.expect("run checker");
        assert_eq!(findings.len(), 1);
        assert_eq!(checker.name(), "fixed");
    }
}
