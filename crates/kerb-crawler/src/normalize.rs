//! URL normalization for the visited set.
//!
//! Two URLs that normalize identically are the same page for crawl
//! purposes: fragments are presentation state, default ports and trailing
//! slashes are server-side aliases, and query order is irrelevant to
//! almost every server.

use crate::error::{CrawlError, Result};
use url::Url;

/// Normalize a URL into its canonical crawl form.
///
/// Lowercases scheme and host (the `url` crate does this at parse),
/// strips the fragment, drops default ports, sorts query pairs bytewise
/// (removing an empty query) and trims the trailing slash from non-root
/// paths. Only `http` and `https` URLs are accepted.
///
/// # Errors
/// Returns `InvalidStartUrl` when the input cannot be parsed or uses an
/// uncrawlable scheme.
pub fn normalize_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw).map_err(|e| CrawlError::InvalidStartUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(CrawlError::InvalidStartUrl {
            url: raw.to_string(),
            reason: format!("scheme {} is not crawlable", url.scheme()),
        });
    }

    url.set_fragment(None);

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if pairs.is_empty() {
        url.set_query(None);
    } else {
        pairs.sort_unstable();
        let mut query = url.query_pairs_mut();
        query.clear();
        for (key, value) in &pairs {
            query.append_pair(key, value);
        }
        drop(query);
    }

    let path = url.path();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/').to_string();
        url.set_path(&trimmed);
    }

    Ok(url)
}

/// Whether two URLs point at the same host.
#[must_use]
pub fn same_host(a: &Url, b: &Url) -> bool {
    a.host_str() == b.host_str()
}
