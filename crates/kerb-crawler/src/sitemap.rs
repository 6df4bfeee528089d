//! Sitemap seeding for the crawl frontier.

use scraper::{Html, Selector};
use std::time::Duration;
use tracing::debug;
use url::Url;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Pull `<loc>` entries out of a sitemap body.
///
/// Sitemaps are XML, but html5ever happily builds a tree out of them and
/// unknown elements keep their names, so one selector covers both plain
/// sitemaps and sitemap indexes without an XML dependency.
#[must_use]
pub fn parse_locations(body: &str) -> Vec<String> {
    let document = Html::parse_document(body);
    let selector = Selector::parse("loc").expect("valid selector");

    document
        .select(&selector)
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|loc| !loc.is_empty())
        .collect()
}

/// Fetch `/sitemap.xml` from the start URL's origin and return its entries.
///
/// A missing or malformed sitemap yields an empty list; the crawl proceeds
/// from the start URL alone.
pub async fn fetch(client: &reqwest::Client, origin: &Url) -> Vec<String> {
    let Ok(sitemap_url) = origin.join("/sitemap.xml") else {
        return Vec::new();
    };

    let response = client
        .get(sitemap_url.clone())
        .timeout(FETCH_TIMEOUT)
        .send()
        .await;

    match response {
        Ok(resp) if resp.status().is_success() => match resp.text().await {
            Ok(body) => {
                let locations = parse_locations(&body);
                debug!(url = %sitemap_url, entries = locations.len(), "loaded sitemap");
                locations
            }
            Err(e) => {
                debug!(url = %sitemap_url, "could not read sitemap: {e}");
                Vec::new()
            }
        },
        Ok(resp) => {
            debug!(url = %sitemap_url, status = resp.status().as_u16(), "no sitemap");
            Vec::new()
        }
        Err(e) => {
            debug!(url = %sitemap_url, "sitemap fetch failed: {e}");
            Vec::new()
        }
    }
}
