//! Validator — re-checks count conservation and component completeness before a result
//! is accepted as authoritative.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::analysis::{ComponentName, ComponentReport};
use crate::matching::{ComparisonResult, SkillCategory};

/// Expected vs actual count for one checked quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountDiscrepancy {
    pub scope: String,
    pub expected: usize,
    pub actual: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    pub count_discrepancies: Vec<CountDiscrepancy>,
    /// Terms listed as both matched and missing.
    pub overlapping_terms: Vec<String>,
    /// Declared components that are neither scored nor explicitly marked missing.
    pub unaccounted_components: Vec<ComponentName>,
    /// Components whose stored score is outside [0, 100] or filed under the wrong name.
    pub invalid_scores: Vec<ComponentName>,
}

impl ValidationError {
    pub fn is_empty(&self) -> bool {
        self.count_discrepancies.is_empty()
            && self.overlapping_terms.is_empty()
            && self.unaccounted_components.is_empty()
            && self.invalid_scores.is_empty()
    }

    /// Human-readable list of every problem found.
    pub fn issues(&self) -> Vec<String> {
        let mut issues: Vec<String> = self
            .count_discrepancies
            .iter()
            .map(|d| {
                format!(
                    "{}: expected {} requirements, found {}",
                    d.scope, d.expected, d.actual
                )
            })
            .collect();
        issues.extend(
            self.overlapping_terms
                .iter()
                .map(|t| format!("'{t}' is both matched and missing")),
        );
        issues.extend(
            self.unaccounted_components
                .iter()
                .map(|c| format!("component {c} is neither scored nor marked missing")),
        );
        issues.extend(
            self.invalid_scores
                .iter()
                .map(|c| format!("component {c} has an invalid score")),
        );
        issues
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation failed: {}", self.issues().join("; "))
    }
}

impl std::error::Error for ValidationError {}

/// Checks the comparison and component report for internal consistency.
pub fn validate(
    comparison: &ComparisonResult,
    report: &ComponentReport,
) -> Result<(), ValidationError> {
    let mut err = ValidationError::default();

    let mut total_expected = 0;
    let mut total_matched = 0;
    for category in SkillCategory::ALL {
        let c = comparison.category(category);
        total_expected += c.total;
        total_matched += c.matched.len();

        let actual = c.matched.len() + c.missing.len();
        if actual != c.total {
            err.count_discrepancies.push(CountDiscrepancy {
                scope: category.to_string(),
                expected: c.total,
                actual,
            });
        }
        err.overlapping_terms
            .extend(c.matched.intersection(&c.missing).cloned());
    }

    let summary = &comparison.match_summary;
    if summary.total_jd_requirements != total_expected {
        err.count_discrepancies.push(CountDiscrepancy {
            scope: "match_summary.total_jd_requirements".to_string(),
            expected: total_expected,
            actual: summary.total_jd_requirements,
        });
    }
    if summary.total_matches != total_matched {
        err.count_discrepancies.push(CountDiscrepancy {
            scope: "match_summary.total_matches".to_string(),
            expected: total_matched,
            actual: summary.total_matches,
        });
    }

    for name in &report.expected {
        let scored = report.scores.contains_key(name);
        let marked_missing = report.failures.iter().any(|f| f.name == *name);
        if !scored && !marked_missing {
            err.unaccounted_components.push(*name);
        }
    }

    for (name, score) in &report.scores {
        if score.name != *name || !(0.0..=100.0).contains(&score.score) {
            err.invalid_scores.push(*name);
        }
    }

    if err.is_empty() {
        Ok(())
    } else {
        Err(err)
    }
}
