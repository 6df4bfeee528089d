//! Minimal robots.txt support for the crawl.
//!
//! Only `Disallow:` prefix rules in `User-agent: *` groups are honored.
//! That covers the overwhelmingly common case without pulling in a full
//! robots parser; anything we cannot fetch or read simply yields no
//! exclusions.

use std::time::Duration;
use tracing::debug;
use url::Url;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Disallow rules extracted from a site's robots.txt.
#[derive(Debug, Clone, Default)]
pub struct RobotsRules {
    disallow: Vec<String>,
}

impl RobotsRules {
    /// Rules that exclude nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse the wildcard-agent Disallow rules out of a robots.txt body.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut disallow = Vec::new();
        let mut group_matches = false;
        let mut reading_agents = false;

        for line in text.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    // A user-agent line after rules starts a new group.
                    if !reading_agents {
                        group_matches = false;
                    }
                    reading_agents = true;
                    if value == "*" {
                        group_matches = true;
                    }
                }
                "disallow" => {
                    reading_agents = false;
                    if group_matches && !value.is_empty() {
                        disallow.push(value.to_string());
                    }
                }
                _ => {
                    reading_agents = false;
                }
            }
        }

        Self { disallow }
    }

    /// Whether the rules permit crawling the given path.
    #[must_use]
    pub fn allows(&self, path: &str) -> bool {
        !self.disallow.iter().any(|prefix| path.starts_with(prefix))
    }

    /// Whether any rule was parsed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.disallow.is_empty()
    }
}

/// Fetch and parse `/robots.txt` from the start URL's origin.
///
/// Any fetch or read failure means no exclusions.
pub async fn fetch(client: &reqwest::Client, origin: &Url) -> RobotsRules {
    let Ok(robots_url) = origin.join("/robots.txt") else {
        return RobotsRules::empty();
    };

    let response = client
        .get(robots_url.clone())
        .timeout(FETCH_TIMEOUT)
        .send()
        .await;

    match response {
        Ok(resp) if resp.status().is_success() => match resp.text().await {
            Ok(text) => {
                let rules = RobotsRules::parse(&text);
                debug!(url = %robots_url, rules = rules.disallow.len(), "loaded robots.txt");
                rules
            }
            Err(e) => {
                debug!(url = %robots_url, "could not read robots.txt: {e}");
                RobotsRules::empty()
            }
        },
        Ok(resp) => {
            debug!(url = %robots_url, status = resp.status().as_u16(), "no robots.txt");
            RobotsRules::empty()
        }
        Err(e) => {
            debug!(url = %robots_url, "robots.txt fetch failed: {e}");
            RobotsRules::empty()
        }
    }
}
