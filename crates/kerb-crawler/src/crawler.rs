//! Breadth-first page discovery.

use crate::error::{CrawlError, Result};
use crate::filter::{is_scannable_target, UrlFilters};
use crate::normalize::{normalize_url, same_host};
use crate::robots::{self, RobotsRules};
use crate::sitemap;
use kerb_browser::Renderer;
use kerb_core::ScanConfig;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use url::Url;

/// What one traversal produced.
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    /// Every admitted URL in discovery order, normalized.
    ///
    /// A URL whose crawl fetch failed is still listed; the scan phase gets
    /// its own attempt at it with retries.
    pub urls: Vec<String>,
    /// Fetch attempts made during the traversal
    pub attempted: usize,
    /// Fetch attempts that failed
    pub failed: usize,
}

/// Breadth-first crawler over one site.
///
/// Traversal is sequential and bounded by the scan configuration; each
/// call to [`Crawler::discover`] starts from scratch.
pub struct Crawler {
    renderer: Arc<dyn Renderer>,
    http: reqwest::Client,
}

impl Crawler {
    /// Create a crawler over the given rendering engine.
    #[must_use]
    pub fn new(renderer: Arc<dyn Renderer>) -> Self {
        Self {
            renderer,
            http: reqwest::Client::new(),
        }
    }

    /// Discover the site's page set from a start URL.
    ///
    /// Fetches robots.txt and sitemap.xml first when the configuration
    /// asks for them, then walks links breadth-first under the configured
    /// depth/page bounds.
    ///
    /// # Errors
    /// Returns `InvalidStartUrl` for an unusable start URL and `Aborted`
    /// when the fetch failure rate crosses the configured threshold.
    pub async fn discover(&self, start_url: &str, config: &ScanConfig) -> Result<CrawlOutcome> {
        let start = normalize_url(start_url)?;

        let rules = if config.respect_robots_txt {
            robots::fetch(&self.http, &start).await
        } else {
            RobotsRules::empty()
        };

        let seeds = if config.use_sitemap {
            sitemap::fetch(&self.http, &start).await
        } else {
            Vec::new()
        };

        info!(
            start = %start,
            max_depth = config.max_depth,
            max_pages = config.max_pages,
            sitemap_seeds = seeds.len(),
            "starting crawl"
        );

        self.run_traversal(start, config, &rules, seeds).await
    }

    async fn run_traversal(
        &self,
        start: Url,
        config: &ScanConfig,
        rules: &RobotsRules,
        seeds: Vec<String>,
    ) -> Result<CrawlOutcome> {
        let filters = UrlFilters::compile(&config.include_patterns, &config.exclude_patterns)?;

        let mut visited: HashSet<String> = HashSet::new();
        let mut order: Vec<String> = Vec::new();
        let mut frontier: VecDeque<(Url, u32)> = VecDeque::new();

        // The start URL bypasses every admission filter.
        visited.insert(start.as_str().to_string());
        order.push(start.as_str().to_string());
        frontier.push_back((start.clone(), 0));

        // Sitemap entries join the initial frontier at depth 0, so depth
        // never gates them; they count toward the page bound like any URL.
        for raw in seeds {
            if visited.len() >= config.max_pages {
                break;
            }
            let Ok(candidate) = normalize_url(&raw) else {
                continue;
            };
            if !admissible(&candidate, &start, config, &filters, rules) {
                continue;
            }
            if visited.insert(candidate.as_str().to_string()) {
                order.push(candidate.as_str().to_string());
                frontier.push_back((candidate, 0));
            }
        }

        let mut attempted = 0usize;
        let mut failed = 0usize;

        while let Some((url, depth)) = frontier.pop_front() {
            attempted += 1;
            match self.renderer.load(url.as_str()).await {
                Err(e) => {
                    failed += 1;
                    warn!(url = %url, depth, "crawl fetch failed: {e}");
                }
                Ok(page) => {
                    let links = page.links.clone();
                    self.renderer.close(page).await;
                    debug!(url = %url, depth, links = links.len(), "crawled page");

                    if depth < config.max_depth {
                        for link in links {
                            if visited.len() >= config.max_pages {
                                break;
                            }
                            let Ok(candidate) = normalize_url(&link) else {
                                continue;
                            };
                            if !admissible(&candidate, &start, config, &filters, rules) {
                                continue;
                            }
                            if visited.insert(candidate.as_str().to_string()) {
                                order.push(candidate.as_str().to_string());
                                frontier.push_back((candidate, depth + 1));
                            }
                        }
                    }
                }
            }

            if attempted >= config.min_fetches_before_abort as usize
                && failure_ratio(failed, attempted) > config.abort_failure_ratio
            {
                error!(
                    attempted,
                    failed,
                    threshold = config.abort_failure_ratio,
                    "aborting crawl: failure rate exceeded"
                );
                return Err(CrawlError::Aborted {
                    attempted,
                    failed,
                    threshold: config.abort_failure_ratio,
                });
            }
        }

        info!(pages = order.len(), attempted, failed, "crawl finished");

        Ok(CrawlOutcome {
            urls: order,
            attempted,
            failed,
        })
    }
}

fn admissible(
    candidate: &Url,
    start: &Url,
    config: &ScanConfig,
    filters: &UrlFilters,
    rules: &RobotsRules,
) -> bool {
    if config.same_domain_only && !same_host(candidate, start) {
        return false;
    }
    if !is_scannable_target(candidate) {
        return false;
    }
    if !filters.admits(candidate.as_str()) {
        return false;
    }
    rules.allows(candidate.path())
}

#[allow(clippy::cast_precision_loss)]
fn failure_ratio(failed: usize, attempted: usize) -> f64 {
    if attempted == 0 {
        0.0
    } else {
        failed as f64 / attempted as f64
    }
}
