use crate::error::{RenderError, Result};
use crate::page::{PageHandle, RenderedPage, Renderer};
use crate::parse;
use crate::profile::BrowserProfile;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as ChromiumConfig};
use chromiumoxide::Page;
use futures_util::stream::StreamExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

/// Reads the main document's HTTP status out of the navigation timing entry.
const STATUS_JS: &str = "(() => { const e = performance.getEntriesByType('navigation')[0]; \
                         return e && e.responseStatus ? e.responseStatus : 0; })()";

/// Headless Chromium rendering engine.
///
/// Pages stay open in an internal table until `close` is called with their
/// snapshot, so the browser tab outlives the load call for engines that
/// need it.
pub struct ChromiumRenderer {
    browser: Browser,
    profile: BrowserProfile,
    navigation_timeout: Duration,
    pages: Mutex<HashMap<u64, Page>>,
    next_handle: AtomicU64,
}

impl ChromiumRenderer {
    /// Launch a browser process with the given configuration.
    pub async fn launch(config: &kerb_core::BrowserConfig) -> Result<Self> {
        let profile = BrowserProfile::select(config);

        let mut builder = ChromiumConfig::builder()
            .no_sandbox()
            .window_size(profile.viewport_width, profile.viewport_height);
        if !config.headless {
            builder = builder.with_head();
        }
        let chromium_config = builder.build().map_err(RenderError::Launch)?;

        let (browser, mut handler) = Browser::launch(chromium_config)
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;

        // Spawn browser handler
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        info!(
            user_agent = %profile.user_agent,
            headless = config.headless,
            "launched chromium engine"
        );

        Ok(Self {
            browser,
            profile,
            navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
            pages: Mutex::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
        })
    }

    /// Number of pages currently held open by the engine.
    pub async fn open_pages(&self) -> usize {
        self.pages.lock().await.len()
    }

    async fn main_status(page: &Page) -> Option<u16> {
        let status = page
            .evaluate(STATUS_JS)
            .await
            .ok()?
            .into_value::<u16>()
            .ok()?;
        if status == 0 {
            None
        } else {
            Some(status)
        }
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn load(&self, url: &str) -> Result<RenderedPage> {
        Url::parse(url).map_err(|e| RenderError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let started = Instant::now();

        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| RenderError::Navigation {
                url: url.to_string(),
                reason: format!("could not open page: {e}"),
            })?;

        if let Err(e) = page.set_user_agent(self.profile.user_agent.clone()).await {
            warn!(url, "could not set user agent: {e}");
        }

        let nav = tokio::time::timeout(self.navigation_timeout, async {
            page.goto(url).await?;
            page.wait_for_navigation().await?;
            Ok::<(), chromiumoxide::error::CdpError>(())
        })
        .await;

        match nav {
            Err(_) => {
                let _ = page.close().await;
                return Err(RenderError::Timeout {
                    url: url.to_string(),
                    timeout_secs: self.navigation_timeout.as_secs(),
                });
            }
            Ok(Err(e)) => {
                let _ = page.close().await;
                return Err(RenderError::Navigation {
                    url: url.to_string(),
                    reason: e.to_string(),
                });
            }
            Ok(Ok(())) => {}
        }

        let html = match page.content().await {
            Ok(html) => html,
            Err(e) => {
                let _ = page.close().await;
                return Err(RenderError::Navigation {
                    url: url.to_string(),
                    reason: format!("could not read DOM: {e}"),
                });
            }
        };

        let final_url = page
            .url()
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| url.to_string());
        let status_code = Self::main_status(&page).await;
        let title = parse::extract_title(&html);
        let links = parse::extract_links(&html, &final_url);

        let handle = PageHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        self.pages.lock().await.insert(handle.0, page);

        let load_time_ms = started.elapsed().as_millis() as u64;
        debug!(
            url = %final_url,
            status = ?status_code,
            links = links.len(),
            load_time_ms,
            "rendered page"
        );

        Ok(RenderedPage {
            handle,
            url: final_url,
            title,
            status_code,
            html,
            links,
            load_time_ms,
        })
    }

    async fn close(&self, page: RenderedPage) {
        let tab = self.pages.lock().await.remove(&page.handle.0);
        if let Some(tab) = tab {
            if let Err(e) = tab.close().await {
                warn!(url = %page.url, "failed to close browser page: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "Requires Chrome browser to be installed"]
    async fn test_launch_and_render() {
        let config = kerb_core::BrowserConfig::default();
        let renderer = ChromiumRenderer::launch(&config)
            .await
            .expect("launch chromium");

        let page = renderer
            .load("https://example.com")
            .await
            .expect("render example.com");

        assert!(page.html.contains("<html"));
        assert_eq!(renderer.open_pages().await, 1);

        renderer.close(page).await;
        assert_eq!(renderer.open_pages().await, 0);
    }
}
