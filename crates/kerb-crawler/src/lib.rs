//! Kerb Crawler - bounded breadth-first page discovery.
//!
//! Walks a site's link graph from a start URL under depth and page-count
//! bounds, producing the URL set the scan phase will audit. Traversal is
//! polite (robots.txt, extension and pattern filters) and defensive (a
//! failure-rate threshold aborts crawls of unreachable sites).
//!
//! # Architecture
//!
//! - **Normalization** ([`normalize`]): canonical URL form for the visited set
//! - **Filters** ([`filter`]): extension heuristic and include/exclude patterns
//! - **Robots** ([`robots`]): wildcard-agent Disallow rules
//! - **Sitemap** ([`sitemap`]): frontier seeding from sitemap.xml
//! - **Crawler** ([`crawler`]): the breadth-first traversal itself
//! - **Errors** ([`error`]): crawl-specific error types

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod crawler;
pub mod error;
pub mod filter;
pub mod normalize;
pub mod robots;
pub mod sitemap;

// Re-export commonly used types
pub use crawler::{CrawlOutcome, Crawler};
pub use error::{CrawlError, Result};
pub use filter::UrlFilters;
pub use normalize::normalize_url;
pub use robots::RobotsRules;
