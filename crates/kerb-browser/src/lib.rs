//! Page rendering engines for Kerb scans.
//!
//! Exposes two engines behind the [`Renderer`] trait: a headless Chromium
//! engine for script-heavy sites and a plain-HTTP fetcher for static ones.
//! Both produce self-contained [`RenderedPage`] snapshots that the crawler
//! and checkers consume without touching the live browser.

pub mod chromium;
pub mod error;
pub mod fetch;
pub mod page;
pub mod parse;
pub mod profile;

pub use chromium::ChromiumRenderer;
pub use error::{RenderError, Result};
pub use fetch::StaticRenderer;
pub use page::{PageHandle, RenderedPage, Renderer};
pub use profile::BrowserProfile;
