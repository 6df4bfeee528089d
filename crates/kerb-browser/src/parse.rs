//! HTML extraction helpers shared by the rendering engines.

use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Extract absolute http(s) hyperlinks from a document.
///
/// Relative hrefs are resolved against `base_url`; anchors, mailto/tel/
/// javascript pseudo-links and unparseable hrefs are skipped. Order of
/// first appearance is preserved, duplicates dropped.
pub fn extract_links(html: &str, base_url: &str) -> Vec<String> {
    let Ok(base) = Url::parse(base_url) else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let selector = Selector::parse("a[href]").expect("valid selector");

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') {
            continue;
        }
        if href.starts_with("mailto:") || href.starts_with("tel:") || href.starts_with("javascript:")
        {
            continue;
        }

        let Ok(resolved) = base.join(href) else {
            continue;
        };
        if resolved.scheme() != "http" && resolved.scheme() != "https" {
            continue;
        }

        let link = resolved.to_string();
        if seen.insert(link.clone()) {
            links.push(link);
        }
    }

    links
}

/// Extract the document title, trimmed; `None` when absent or blank.
pub fn extract_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("title").expect("valid selector");

    let title = document
        .select(&selector)
        .next()?
        .text()
        .collect::<String>();
    let title = title.trim();

    if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    }
}
