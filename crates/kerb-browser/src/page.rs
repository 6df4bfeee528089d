use crate::error::Result;
use async_trait::async_trait;

/// Engine-side identifier for resources still held for a loaded page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageHandle(pub u64);

/// A rendered page snapshot.
///
/// The snapshot is self-contained: checkers and the crawler read from it
/// without touching the engine again. The engine may keep live resources
/// (a browser tab) keyed by `handle` until [`Renderer::close`] is called.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// Engine resource handle, released by `Renderer::close`
    pub handle: PageHandle,
    /// Final URL after redirects
    pub url: String,
    /// Document title, if any
    pub title: Option<String>,
    /// HTTP status of the main document, when the engine can observe it
    pub status_code: Option<u16>,
    /// Serialized DOM
    pub html: String,
    /// Absolute http(s) hyperlinks found in the document
    pub links: Vec<String>,
    /// Wall-clock load duration in milliseconds
    pub load_time_ms: u64,
}

/// A page rendering engine.
///
/// One `load` call renders one page; the returned snapshot is owned by the
/// caller and must be passed back to `close` once no checker needs it, so
/// engines holding live resources can release them.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Load a URL and return the rendered page.
    async fn load(&self, url: &str) -> Result<RenderedPage>;

    /// Release any engine resources still associated with the page.
    async fn close(&self, page: RenderedPage);
}
