//! Finding-to-violation aggregation.
//!
//! Checkers overlap: axe and pa11y both flag a missing `alt` on the same
//! image, and pages stamp dynamic ids into selectors so the "same" element
//! keys differently on every render. This module folds raw findings into one
//! [`Violation`] per (rule, page, normalized selector) and orders the output
//! deterministically.

use crate::catalog;
use crate::page::PageResult;
use crate::violation::Violation;
use kerb_checker::Finding;
use kerb_core::{ConformanceLevel, Severity};
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::sync::OnceLock;
use tracing::debug;

/// Normalize a rule identifier for dedup keying.
///
/// Case-folded with `-` and spaces mapped to `_`, so `Image-Alt` and
/// `image_alt` key the same rule. Violations still report the raw id.
#[must_use]
pub fn normalize_rule_id(rule: &str) -> String {
    rule.to_ascii_lowercase().replace(['-', ' '], "_")
}

/// Normalize a selector into its dedup signature.
///
/// Strips trailing dynamic suffixes from id tokens (a hyphen followed by a
/// hex run containing at least one digit, so `#modal-4f3a` becomes `#modal`
/// while `#main-nav` survives) and collapses whitespace.
#[must_use]
pub fn selector_signature(selector: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    static ID_SUFFIX: OnceLock<Regex> = OnceLock::new();

    let whitespace = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"));
    let id_suffix = ID_SUFFIX.get_or_init(|| {
        Regex::new(r"(#[A-Za-z][A-Za-z0-9_-]*?)-[0-9a-fA-F]*[0-9][0-9a-fA-F]*\b")
            .expect("valid regex")
    });

    let mut signature = whitespace.replace_all(selector.trim(), " ").into_owned();
    // Stacked suffixes (#row-7-3e2f) need repeated passes to reach a fixpoint
    loop {
        let stripped = id_suffix.replace_all(&signature, "$1").into_owned();
        if stripped == signature {
            break;
        }
        signature = stripped;
    }
    signature
}

/// Merge state for one violation before metadata resolution.
struct Draft {
    rule: String,
    description: String,
    severity: Severity,
    level: Option<ConformanceLevel>,
    help_url: Option<String>,
    wcag_criteria: Vec<String>,
    occurrences: Vec<String>,
    detected_by: BTreeSet<String>,
}

impl Draft {
    fn new(finding: &Finding) -> Self {
        Self {
            rule: finding.rule.clone(),
            description: finding.description.clone(),
            severity: finding.impact,
            level: finding.level,
            help_url: finding.help_url.clone(),
            wcag_criteria: finding.wcag_criteria.clone(),
            occurrences: vec![finding.selector.clone()],
            detected_by: BTreeSet::from([finding.checker.clone()]),
        }
    }

    fn absorb(&mut self, finding: &Finding) {
        self.severity = self.severity.max(finding.impact);
        if self.level.is_none() {
            self.level = finding.level;
        }
        if self.help_url.is_none() {
            self.help_url = finding.help_url.clone();
        }
        if self.wcag_criteria.is_empty() {
            self.wcag_criteria = finding.wcag_criteria.clone();
        }
        if !self.occurrences.contains(&finding.selector) {
            self.occurrences.push(finding.selector.clone());
        }
        self.detected_by.insert(finding.checker.clone());
    }

    fn finish(self, page_url: String, selector: String) -> Violation {
        let meta = catalog::resolve_meta(&self.wcag_criteria, self.level);
        Violation {
            rule: self.rule,
            description: self.description,
            severity: self.severity,
            level: meta.level,
            principle: meta.principle,
            page_url,
            selector,
            occurrences: self.occurrences,
            detected_by: self.detected_by.into_iter().collect(),
            help_url: self.help_url,
            wcag_criteria: self.wcag_criteria,
        }
    }
}

/// Fold every finding in `pages` into deduplicated violations.
///
/// Output ordering is severity descending, then rule, page URL, and selector
/// signature ascending, so repeated aggregation of the same input yields an
/// identical list.
#[must_use]
pub fn aggregate(pages: &[PageResult]) -> Vec<Violation> {
    let mut drafts: HashMap<(String, String, String), Draft> = HashMap::new();
    let mut raw_count = 0usize;

    for page in pages {
        for finding in page.findings() {
            raw_count += 1;
            let key = (
                normalize_rule_id(&finding.rule),
                page.url.clone(),
                selector_signature(&finding.selector),
            );
            match drafts.get_mut(&key) {
                Some(draft) => draft.absorb(finding),
                None => {
                    drafts.insert(key, Draft::new(finding));
                }
            }
        }
    }

    let mut keyed: Vec<((String, String, String), Draft)> = drafts.into_iter().collect();
    keyed.sort_by(|(key_a, draft_a), (key_b, draft_b)| {
        draft_b
            .severity
            .cmp(&draft_a.severity)
            .then_with(|| key_a.cmp(key_b))
    });

    let violations: Vec<Violation> = keyed
        .into_iter()
        .map(|((_, page_url, selector), draft)| draft.finish(page_url, selector))
        .collect();

    debug!(
        findings = raw_count,
        violations = violations.len(),
        "aggregated findings"
    );
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::CheckerRun;
    use kerb_core::Principle;

    fn page_with(url: &str, runs: Vec<CheckerRun>) -> PageResult {
        PageResult::scanned(url, None, Some(200), 100, runs)
    }

    #[test]
    fn test_rule_id_normalization() {
        assert_eq!(normalize_rule_id("Image-Alt"), "image_alt");
        assert_eq!(normalize_rule_id("image_alt"), "image_alt");
        assert_eq!(normalize_rule_id("color contrast"), "color_contrast");
    }

    #[test]
    fn test_selector_signature_strips_dynamic_ids() {
        assert_eq!(selector_signature("#modal-4f3a"), "#modal");
        assert_eq!(selector_signature("#modal-9b2c > button"), "#modal > button");
        assert_eq!(selector_signature("div#toast-12"), "div#toast");
        // Hex-looking words without a digit are real names, not noise
        assert_eq!(selector_signature("#main-nav"), "#main-nav");
        assert_eq!(selector_signature("#feed-beef"), "#feed-beef");
    }

    #[test]
    fn test_selector_signature_strips_stacked_suffixes() {
        assert_eq!(selector_signature("#row-7-3e2f"), "#row");
    }

    #[test]
    fn test_selector_signature_collapses_whitespace() {
        assert_eq!(selector_signature("  ul   >\n li "), "ul > li");
    }

    #[test]
    fn test_same_issue_from_two_checkers_merges() {
        let page = page_with(
            "https://example.org/",
            vec![
                CheckerRun::succeeded(
                    "axe",
                    vec![Finding::new(
                        "image-alt",
                        "Images must have alternate text",
                        Severity::Critical,
                        "img#hero",
                        "axe",
                    )],
                    100,
                ),
                CheckerRun::succeeded(
                    "pa11y",
                    vec![Finding::new(
                        "image-alt",
                        "Img element missing an alt attribute",
                        Severity::Serious,
                        "img#hero",
                        "pa11y",
                    )],
                    150,
                ),
            ],
        );

        let violations = aggregate(std::slice::from_ref(&page));

        assert_eq!(violations.len(), 1);
        let violation = &violations[0];
        assert_eq!(violation.rule, "image-alt");
        assert_eq!(violation.detected_by, vec!["axe", "pa11y"]);
        // Max severity wins when checkers disagree
        assert_eq!(violation.severity, Severity::Critical);
        // First-seen description wins
        assert_eq!(violation.description, "Images must have alternate text");
    }

    #[test]
    fn test_same_rule_on_different_pages_stays_distinct() {
        let finding = Finding::new("label", "Missing label", Severity::Serious, "input", "axe");
        let pages = vec![
            page_with(
                "https://example.org/a",
                vec![CheckerRun::succeeded("axe", vec![finding.clone()], 50)],
            ),
            page_with(
                "https://example.org/b",
                vec![CheckerRun::succeeded("axe", vec![finding], 50)],
            ),
        ];

        let violations = aggregate(&pages);
        assert_eq!(violations.len(), 2);
        assert_ne!(violations[0].page_url, violations[1].page_url);
    }

    #[test]
    fn test_dynamic_id_variants_merge_with_raw_occurrences_kept() {
        let page = page_with(
            "https://example.org/",
            vec![CheckerRun::succeeded(
                "axe",
                vec![
                    Finding::new("aria-hidden-focus", "Focusable hidden", Severity::Moderate, "#modal-4f3a", "axe"),
                    Finding::new("aria-hidden-focus", "Focusable hidden", Severity::Moderate, "#modal-9b2c", "axe"),
                ],
                80,
            )],
        );

        let violations = aggregate(std::slice::from_ref(&page));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].selector, "#modal");
        assert_eq!(violations[0].occurrences, vec!["#modal-4f3a", "#modal-9b2c"]);
    }

    #[test]
    fn test_rule_casing_variants_merge() {
        let page = page_with(
            "https://example.org/",
            vec![
                CheckerRun::succeeded(
                    "axe",
                    vec![Finding::new("Image-Alt", "Missing alt", Severity::Critical, "img", "axe")],
                    40,
                ),
                CheckerRun::succeeded(
                    "htmlcs",
                    vec![Finding::new("image_alt", "Missing alt", Severity::Critical, "img", "htmlcs")],
                    45,
                ),
            ],
        );

        let violations = aggregate(std::slice::from_ref(&page));
        assert_eq!(violations.len(), 1);
        // Raw first-seen id is reported
        assert_eq!(violations[0].rule, "Image-Alt");
    }

    #[test]
    fn test_metadata_resolution_via_catalog() {
        let mut finding = Finding::new("custom-rule", "Custom", Severity::Minor, "p", "axe");
        finding.wcag_criteria = vec!["2.4.2".to_string()];
        let page = page_with(
            "https://example.org/",
            vec![CheckerRun::succeeded("axe", vec![finding], 10)],
        );

        let violations = aggregate(std::slice::from_ref(&page));
        assert_eq!(violations[0].level, ConformanceLevel::A);
        assert_eq!(violations[0].principle, Principle::Operable);
    }

    #[test]
    fn test_unknown_rule_defaults_to_aa_robust() {
        let page = page_with(
            "https://example.org/",
            vec![CheckerRun::succeeded(
                "axe",
                vec![Finding::new("vendor-check-17", "Vendor rule", Severity::Minor, "p", "axe")],
                10,
            )],
        );

        let violations = aggregate(std::slice::from_ref(&page));
        assert_eq!(violations[0].level, ConformanceLevel::AA);
        assert_eq!(violations[0].principle, Principle::Robust);
    }

    #[test]
    fn test_ordering_severity_desc_then_rule_page_selector() {
        let page_a = page_with(
            "https://example.org/a",
            vec![CheckerRun::succeeded(
                "axe",
                vec![
                    Finding::new("region", "Landmark", Severity::Moderate, "div.footer", "axe"),
                    Finding::new("image-alt", "Missing alt", Severity::Critical, "img", "axe"),
                    Finding::new("label", "Missing label", Severity::Critical, "input", "axe"),
                ],
                30,
            )],
        );
        let page_b = page_with(
            "https://example.org/b",
            vec![CheckerRun::succeeded(
                "axe",
                vec![Finding::new("image-alt", "Missing alt", Severity::Critical, "img", "axe")],
                30,
            )],
        );

        let violations = aggregate(&[page_a, page_b]);
        let order: Vec<(&str, &str)> = violations
            .iter()
            .map(|v| (v.rule.as_str(), v.page_url.as_str()))
            .collect();

        assert_eq!(
            order,
            vec![
                ("image-alt", "https://example.org/a"),
                ("image-alt", "https://example.org/b"),
                ("label", "https://example.org/a"),
                ("region", "https://example.org/a"),
            ]
        );
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let pages = vec![page_with(
            "https://example.org/",
            vec![
                CheckerRun::succeeded(
                    "axe",
                    vec![
                        Finding::new("image-alt", "Missing alt", Severity::Critical, "img#hero", "axe"),
                        Finding::new("label", "Missing label", Severity::Serious, "input", "axe"),
                    ],
                    60,
                ),
                CheckerRun::succeeded(
                    "pa11y",
                    vec![Finding::new("image-alt", "Missing alt", Severity::Serious, "img#hero", "pa11y")],
                    70,
                ),
            ],
        )];

        let first = aggregate(&pages);
        let second = aggregate(&pages);

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.rule, b.rule);
            assert_eq!(a.page_url, b.page_url);
            assert_eq!(a.selector, b.selector);
            assert_eq!(a.severity, b.severity);
            assert_eq!(a.detected_by, b.detected_by);
        }
    }

    #[test]
    fn test_failed_pages_contribute_nothing() {
        let pages = vec![
            PageResult::failed("https://example.org/broken", "timeout"),
            page_with("https://example.org/", Vec::new()),
        ];
        assert!(aggregate(&pages).is_empty());
    }
}
