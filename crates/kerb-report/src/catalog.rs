//! Static WCAG 2.2 success-criterion reference data.
//!
//! The aggregation stage uses this table to fill in conformance level and
//! principle for findings whose checker did not report them. Rules that map
//! to no known criterion resolve to (AA, Robust) so they still score.

use kerb_core::{ConformanceLevel, Principle};
use std::collections::HashMap;
use std::sync::OnceLock;

/// One WCAG success criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Criterion {
    /// Criterion identifier, e.g. `1.1.1`
    pub id: &'static str,
    /// Criterion name, e.g. `Non-text Content`
    pub name: &'static str,
    /// Conformance level the criterion belongs to
    pub level: ConformanceLevel,
}

/// Conformance level and principle resolved for one rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleMeta {
    /// Conformance level to score the rule at
    pub level: ConformanceLevel,
    /// Principle bucket for per-category scoring
    pub principle: Principle,
}

/// WCAG 2.2 success criteria, in criterion order.
const CRITERIA: &[Criterion] = &[
    // Principle 1: Perceivable
    Criterion { id: "1.1.1", name: "Non-text Content", level: ConformanceLevel::A },
    Criterion { id: "1.2.1", name: "Audio-only and Video-only (Prerecorded)", level: ConformanceLevel::A },
    Criterion { id: "1.2.2", name: "Captions (Prerecorded)", level: ConformanceLevel::A },
    Criterion { id: "1.2.3", name: "Audio Description or Media Alternative (Prerecorded)", level: ConformanceLevel::A },
    Criterion { id: "1.2.4", name: "Captions (Live)", level: ConformanceLevel::AA },
    Criterion { id: "1.2.5", name: "Audio Description (Prerecorded)", level: ConformanceLevel::AA },
    Criterion { id: "1.2.6", name: "Sign Language (Prerecorded)", level: ConformanceLevel::AAA },
    Criterion { id: "1.2.7", name: "Extended Audio Description (Prerecorded)", level: ConformanceLevel::AAA },
    Criterion { id: "1.2.8", name: "Media Alternative (Prerecorded)", level: ConformanceLevel::AAA },
    Criterion { id: "1.2.9", name: "Audio-only (Live)", level: ConformanceLevel::AAA },
    Criterion { id: "1.3.1", name: "Info and Relationships", level: ConformanceLevel::A },
    Criterion { id: "1.3.2", name: "Meaningful Sequence", level: ConformanceLevel::A },
    Criterion { id: "1.3.3", name: "Sensory Characteristics", level: ConformanceLevel::A },
    Criterion { id: "1.3.4", name: "Orientation", level: ConformanceLevel::AA },
    Criterion { id: "1.3.5", name: "Identify Input Purpose", level: ConformanceLevel::AA },
    Criterion { id: "1.3.6", name: "Identify Purpose", level: ConformanceLevel::AAA },
    Criterion { id: "1.4.1", name: "Use of Color", level: ConformanceLevel::A },
    Criterion { id: "1.4.2", name: "Audio Control", level: ConformanceLevel::A },
    Criterion { id: "1.4.3", name: "Contrast (Minimum)", level: ConformanceLevel::AA },
    Criterion { id: "1.4.4", name: "Resize Text", level: ConformanceLevel::AA },
    Criterion { id: "1.4.5", name: "Images of Text", level: ConformanceLevel::AA },
    Criterion { id: "1.4.6", name: "Contrast (Enhanced)", level: ConformanceLevel::AAA },
    Criterion { id: "1.4.7", name: "Low or No Background Audio", level: ConformanceLevel::AAA },
    Criterion { id: "1.4.8", name: "Visual Presentation", level: ConformanceLevel::AAA },
    Criterion { id: "1.4.9", name: "Images of Text (No Exception)", level: ConformanceLevel::AAA },
    Criterion { id: "1.4.10", name: "Reflow", level: ConformanceLevel::AA },
    Criterion { id: "1.4.11", name: "Non-text Contrast", level: ConformanceLevel::AA },
    Criterion { id: "1.4.12", name: "Text Spacing", level: ConformanceLevel::AA },
    Criterion { id: "1.4.13", name: "Content on Hover or Focus", level: ConformanceLevel::AA },
    // Principle 2: Operable
    Criterion { id: "2.1.1", name: "Keyboard", level: ConformanceLevel::A },
    Criterion { id: "2.1.2", name: "No Keyboard Trap", level: ConformanceLevel::A },
    Criterion { id: "2.1.3", name: "Keyboard (No Exception)", level: ConformanceLevel::AAA },
    Criterion { id: "2.1.4", name: "Character Key Shortcuts", level: ConformanceLevel::A },
    Criterion { id: "2.2.1", name: "Timing Adjustable", level: ConformanceLevel::A },
    Criterion { id: "2.2.2", name: "Pause, Stop, Hide", level: ConformanceLevel::A },
    Criterion { id: "2.2.3", name: "No Timing", level: ConformanceLevel::AAA },
    Criterion { id: "2.2.4", name: "Interruptions", level: ConformanceLevel::AAA },
    Criterion { id: "2.2.5", name: "Re-authenticating", level: ConformanceLevel::AAA },
    Criterion { id: "2.2.6", name: "Timeouts", level: ConformanceLevel::AAA },
    Criterion { id: "2.3.1", name: "Three Flashes or Below Threshold", level: ConformanceLevel::A },
    Criterion { id: "2.3.2", name: "Three Flashes", level: ConformanceLevel::AAA },
    Criterion { id: "2.3.3", name: "Animation from Interactions", level: ConformanceLevel::AAA },
    Criterion { id: "2.4.1", name: "Bypass Blocks", level: ConformanceLevel::A },
    Criterion { id: "2.4.2", name: "Page Titled", level: ConformanceLevel::A },
    Criterion { id: "2.4.3", name: "Focus Order", level: ConformanceLevel::A },
    Criterion { id: "2.4.4", name: "Link Purpose (In Context)", level: ConformanceLevel::A },
    Criterion { id: "2.4.5", name: "Multiple Ways", level: ConformanceLevel::AA },
    Criterion { id: "2.4.6", name: "Headings and Labels", level: ConformanceLevel::AA },
    Criterion { id: "2.4.7", name: "Focus Visible", level: ConformanceLevel::AA },
    Criterion { id: "2.4.8", name: "Location", level: ConformanceLevel::AAA },
    Criterion { id: "2.4.9", name: "Link Purpose (Link Only)", level: ConformanceLevel::AAA },
    Criterion { id: "2.4.10", name: "Section Headings", level: ConformanceLevel::AAA },
    Criterion { id: "2.4.11", name: "Focus Not Obscured (Minimum)", level: ConformanceLevel::AA },
    Criterion { id: "2.4.12", name: "Focus Not Obscured (Enhanced)", level: ConformanceLevel::AAA },
    Criterion { id: "2.4.13", name: "Focus Appearance", level: ConformanceLevel::AAA },
    Criterion { id: "2.5.1", name: "Pointer Gestures", level: ConformanceLevel::A },
    Criterion { id: "2.5.2", name: "Pointer Cancellation", level: ConformanceLevel::A },
    Criterion { id: "2.5.3", name: "Label in Name", level: ConformanceLevel::A },
    Criterion { id: "2.5.4", name: "Motion Actuation", level: ConformanceLevel::A },
    Criterion { id: "2.5.5", name: "Target Size (Enhanced)", level: ConformanceLevel::AAA },
    Criterion { id: "2.5.6", name: "Concurrent Input Mechanisms", level: ConformanceLevel::AAA },
    Criterion { id: "2.5.7", name: "Dragging Movements", level: ConformanceLevel::AA },
    Criterion { id: "2.5.8", name: "Target Size (Minimum)", level: ConformanceLevel::AA },
    // Principle 3: Understandable
    Criterion { id: "3.1.1", name: "Language of Page", level: ConformanceLevel::A },
    Criterion { id: "3.1.2", name: "Language of Parts", level: ConformanceLevel::AA },
    Criterion { id: "3.1.3", name: "Unusual Words", level: ConformanceLevel::AAA },
    Criterion { id: "3.1.4", name: "Abbreviations", level: ConformanceLevel::AAA },
    Criterion { id: "3.1.5", name: "Reading Level", level: ConformanceLevel::AAA },
    Criterion { id: "3.1.6", name: "Pronunciation", level: ConformanceLevel::AAA },
    Criterion { id: "3.2.1", name: "On Focus", level: ConformanceLevel::A },
    Criterion { id: "3.2.2", name: "On Input", level: ConformanceLevel::A },
    Criterion { id: "3.2.3", name: "Consistent Navigation", level: ConformanceLevel::AA },
    Criterion { id: "3.2.4", name: "Consistent Identification", level: ConformanceLevel::AA },
    Criterion { id: "3.2.5", name: "Change on Request", level: ConformanceLevel::AAA },
    Criterion { id: "3.2.6", name: "Consistent Help", level: ConformanceLevel::A },
    Criterion { id: "3.3.1", name: "Error Identification", level: ConformanceLevel::A },
    Criterion { id: "3.3.2", name: "Labels or Instructions", level: ConformanceLevel::A },
    Criterion { id: "3.3.3", name: "Error Suggestion", level: ConformanceLevel::AA },
    Criterion { id: "3.3.4", name: "Error Prevention (Legal, Financial, Data)", level: ConformanceLevel::AA },
    Criterion { id: "3.3.5", name: "Help", level: ConformanceLevel::AAA },
    Criterion { id: "3.3.6", name: "Error Prevention (All)", level: ConformanceLevel::AAA },
    Criterion { id: "3.3.7", name: "Redundant Entry", level: ConformanceLevel::A },
    Criterion { id: "3.3.8", name: "Accessible Authentication (Minimum)", level: ConformanceLevel::AA },
    Criterion { id: "3.3.9", name: "Accessible Authentication (Enhanced)", level: ConformanceLevel::AAA },
    // Principle 4: Robust
    Criterion { id: "4.1.1", name: "Parsing", level: ConformanceLevel::A },
    Criterion { id: "4.1.2", name: "Name, Role, Value", level: ConformanceLevel::A },
    Criterion { id: "4.1.3", name: "Status Messages", level: ConformanceLevel::AA },
];

/// Look up a success criterion by its identifier (e.g. `"1.4.3"`).
#[must_use]
pub fn criterion(id: &str) -> Option<&'static Criterion> {
    static INDEX: OnceLock<HashMap<&'static str, &'static Criterion>> = OnceLock::new();
    let index = INDEX.get_or_init(|| CRITERIA.iter().map(|c| (c.id, c)).collect());
    index.get(id).copied()
}

/// Principle a criterion belongs to, derived from its leading digit.
///
/// Unrecognized identifiers fall back to `Perceivable`, matching the most
/// common bucket for malformed checker tags.
#[must_use]
pub fn principle_of(criterion_id: &str) -> Principle {
    if criterion_id.starts_with("2.") {
        Principle::Operable
    } else if criterion_id.starts_with("3.") {
        Principle::Understandable
    } else if criterion_id.starts_with("4.") {
        Principle::Robust
    } else {
        Principle::Perceivable
    }
}

/// Resolve the level and principle to score a rule at.
///
/// The checker-reported level wins when present; otherwise the first tagged
/// criterion's catalog entry decides. A rule with no criteria at all resolves
/// to (AA, Robust).
#[must_use]
pub fn resolve_meta(criteria: &[String], reported_level: Option<ConformanceLevel>) -> RuleMeta {
    let first = criteria.first().map(String::as_str);

    let level = reported_level
        .or_else(|| first.and_then(criterion).map(|c| c.level))
        .unwrap_or(ConformanceLevel::AA);

    let principle = match first {
        Some(id) => principle_of(id),
        None => Principle::Robust,
    };

    RuleMeta { level, principle }
}
