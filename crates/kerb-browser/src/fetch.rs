use crate::error::{RenderError, Result};
use crate::page::{PageHandle, RenderedPage, Renderer};
use crate::parse;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

/// Plain-HTTP rendering engine.
///
/// Fetches the raw document without executing scripts. Much cheaper than
/// Chromium and the right choice for crawling static sites, but pages that
/// build their DOM client-side will come back mostly empty.
pub struct StaticRenderer {
    client: reqwest::Client,
    timeout_secs: u64,
    next_handle: AtomicU64,
}

impl StaticRenderer {
    /// Build a fetcher from the browser section of the configuration.
    pub fn new(config: &kerb_core::BrowserConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.navigation_timeout_secs))
            .build()
            .map_err(|e| RenderError::Launch(e.to_string()))?;

        Ok(Self {
            client,
            timeout_secs: config.navigation_timeout_secs,
            next_handle: AtomicU64::new(1),
        })
    }

    fn classify(&self, url: &str, err: reqwest::Error) -> RenderError {
        if err.is_timeout() {
            RenderError::Timeout {
                url: url.to_string(),
                timeout_secs: self.timeout_secs,
            }
        } else {
            RenderError::Navigation {
                url: url.to_string(),
                reason: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl Renderer for StaticRenderer {
    async fn load(&self, url: &str) -> Result<RenderedPage> {
        Url::parse(url).map_err(|e| RenderError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let started = Instant::now();

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(url, e))?;

        let status = response.status();
        let final_url = response.url().to_string();

        if !status.is_success() {
            return Err(RenderError::HttpStatus {
                url: final_url,
                status: status.as_u16(),
            });
        }

        let html = response
            .text()
            .await
            .map_err(|e| self.classify(&final_url, e))?;

        let title = parse::extract_title(&html);
        let links = parse::extract_links(&html, &final_url);
        let load_time_ms = started.elapsed().as_millis() as u64;

        debug!(url = %final_url, status = status.as_u16(), links = links.len(), "fetched page");

        Ok(RenderedPage {
            handle: PageHandle(self.next_handle.fetch_add(1, Ordering::Relaxed)),
            url: final_url,
            title,
            status_code: Some(status.as_u16()),
            html,
            links,
            load_time_ms,
        })
    }

    async fn close(&self, _page: RenderedPage) {
        // Nothing held open for plain fetches.
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_builds_client() {
        let config = kerb_core::BrowserConfig::default();
        let renderer = StaticRenderer::new(&config);
        assert!(renderer.is_ok());
    }

    #[tokio::test]
    async fn test_load_rejects_invalid_url() {
        let config = kerb_core::BrowserConfig::default();
        let renderer = StaticRenderer::new(&config).expect("build fetcher");

        let err = renderer.load("not a url").await.unwrap_err();
        assert!(matches!(err, RenderError::InvalidUrl { .. }));
        assert!(!err.is_retryable());
    }
}
