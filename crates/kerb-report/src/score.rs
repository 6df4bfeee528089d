//! Weighted compliance scoring.
//!
//! Each violation costs `severity weight x conformance-level weight`. The
//! total penalty is normalized against a budget proportional to the number of
//! pages scanned, so a 50-page site is not punished for having more raw
//! findings than a 2-page site with the same density of problems.

use crate::violation::Violation;
use kerb_core::{ConformanceLevel, Principle, ScoreConfig, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Tunable scoring weights.
///
/// The defaults carry the published constants; relative ordering between the
/// tiers is the contract, the exact numbers are configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    /// Penalty weight for critical violations
    pub critical: f64,
    /// Penalty weight for serious violations
    pub serious: f64,
    /// Penalty weight for moderate violations
    pub moderate: f64,
    /// Penalty weight for minor violations
    pub minor: f64,
    /// Multiplier for level A rules
    pub level_a: f64,
    /// Multiplier for level AA rules
    pub level_aa: f64,
    /// Multiplier for level AAA rules
    pub level_aaa: f64,
    /// Penalty budget granted per scanned page before the score hits 0
    pub baseline_per_page: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            critical: Severity::Critical.weight(),
            serious: Severity::Serious.weight(),
            moderate: Severity::Moderate.weight(),
            minor: Severity::Minor.weight(),
            level_a: ConformanceLevel::A.weight(),
            level_aa: ConformanceLevel::AA.weight(),
            level_aaa: ConformanceLevel::AAA.weight(),
            baseline_per_page: 100.0,
        }
    }
}

impl From<&ScoreConfig> for ScoreWeights {
    fn from(config: &ScoreConfig) -> Self {
        Self {
            critical: config.critical_weight,
            serious: config.serious_weight,
            moderate: config.moderate_weight,
            minor: config.minor_weight,
            level_a: config.level_a_weight,
            level_aa: config.level_aa_weight,
            level_aaa: config.level_aaa_weight,
            baseline_per_page: config.baseline_per_page,
        }
    }
}

impl ScoreWeights {
    fn severity_weight(&self, severity: Severity) -> f64 {
        match severity {
            Severity::Critical => self.critical,
            Severity::Serious => self.serious,
            Severity::Moderate => self.moderate,
            Severity::Minor => self.minor,
        }
    }

    fn level_weight(&self, level: ConformanceLevel) -> f64 {
        match level {
            ConformanceLevel::A => self.level_a,
            ConformanceLevel::AA => self.level_aa,
            ConformanceLevel::AAA => self.level_aaa,
        }
    }

    /// Penalty one violation contributes to the total.
    #[must_use]
    pub fn penalty(&self, violation: &Violation) -> f64 {
        self.severity_weight(violation.severity) * self.level_weight(violation.level)
    }
}

/// Coarse compliance classification derived from the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceBand {
    /// At least one critical violation, or pervasive failures
    NonCompliant,
    /// No criticals, but the score falls below every conformance cut
    PartiallyCompliant,
    /// Score at or above 75 with no criticals
    A,
    /// Score at or above 85 with no criticals
    AA,
    /// Score at or above 95 with no criticals
    AAA,
}

impl std::fmt::Display for ComplianceBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NonCompliant => "non-compliant",
            Self::PartiallyCompliant => "partially-compliant",
            Self::A => "A",
            Self::AA => "AA",
            Self::AAA => "AAA",
        };
        write!(f, "{name}")
    }
}

/// The computed compliance score for one scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceScore {
    /// Overall score, 0-100
    pub overall: f64,
    /// Score per WCAG principle, same scale
    pub by_principle: BTreeMap<Principle, f64>,
    /// Banded classification of the overall score
    pub band: ComplianceBand,
}

/// Turns a violation list into a [`ComplianceScore`].
#[derive(Debug, Clone, Default)]
pub struct ComplianceScorer {
    weights: ScoreWeights,
}

impl ComplianceScorer {
    /// Scorer with the default weights.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scorer with caller-supplied weights.
    #[must_use]
    pub fn with_weights(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    /// Score `violations` found across `page_count` scanned pages.
    #[must_use]
    pub fn score(&self, violations: &[Violation], page_count: usize) -> ComplianceScore {
        #[allow(clippy::cast_precision_loss)]
        let budget = self.weights.baseline_per_page * page_count.max(1) as f64;

        let overall = self.normalized(violations.iter(), budget);

        let mut by_principle = BTreeMap::new();
        for principle in Principle::all() {
            let subset = violations.iter().filter(|v| v.principle == principle);
            by_principle.insert(principle, self.normalized(subset, budget));
        }

        let band = Self::band(overall, violations);

        debug!(
            overall,
            band = %band,
            violations = violations.len(),
            pages = page_count,
            "scored scan"
        );

        ComplianceScore {
            overall,
            by_principle,
            band,
        }
    }

    fn normalized<'a>(&self, violations: impl Iterator<Item = &'a Violation>, budget: f64) -> f64 {
        let penalty: f64 = violations.map(|v| self.weights.penalty(v)).sum();
        let deduction = (penalty / budget * 100.0).clamp(0.0, 100.0);
        round2(100.0 - deduction)
    }

    fn band(overall: f64, violations: &[Violation]) -> ComplianceBand {
        // Any critical violation caps the band regardless of score
        if violations.iter().any(|v| v.severity == Severity::Critical) {
            return ComplianceBand::NonCompliant;
        }
        if overall >= 95.0 {
            ComplianceBand::AAA
        } else if overall >= 85.0 {
            ComplianceBand::AA
        } else if overall >= 75.0 {
            ComplianceBand::A
        } else {
            ComplianceBand::PartiallyCompliant
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
