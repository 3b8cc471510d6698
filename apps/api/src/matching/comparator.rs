//! Match Comparator — splits every JD requirement into `matched` or `missing` per category.
//!
//! Pure and deterministic: categories are `BTreeSet`s, CV candidates are visited in sorted
//! order, and the strongest accepted match kind wins.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::errors::EngineError;
use crate::matching::relevance::{GateVerdict, MatchKind, RejectReason, RelevanceGate};
use crate::matching::skill_set::{is_normalized, SkillCategory, SkillSet};

/// Which CV term satisfied a JD requirement, and how.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchEvidence {
    pub jd_term: String,
    pub cv_term: String,
    pub kind: MatchKind,
}

/// A candidate pairing the relevance gate refused. Kept for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateRejection {
    pub jd_term: String,
    pub cv_term: String,
    pub reason: RejectReason,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryComparison {
    pub matched: BTreeSet<String>,
    pub missing: BTreeSet<String>,
    /// Declared requirement count: the size of the JD-side category.
    pub total: usize,
    pub evidence: Vec<MatchEvidence>,
    pub gate_rejections: Vec<GateRejection>,
}

impl CategoryComparison {
    /// matched ÷ total as a percentage, rounded to two decimals. Zero when nothing is required.
    pub fn match_rate(&self) -> f64 {
        percentage(self.matched.len(), self.total)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub total_jd_requirements: usize,
    pub total_matches: usize,
    pub match_percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub technical: CategoryComparison,
    pub soft: CategoryComparison,
    pub domain: CategoryComparison,
    pub match_summary: MatchSummary,
}

impl ComparisonResult {
    pub fn category(&self, category: SkillCategory) -> &CategoryComparison {
        match category {
            SkillCategory::Technical => &self.technical,
            SkillCategory::Soft => &self.soft,
            SkillCategory::Domain => &self.domain,
        }
    }

    pub fn match_rate(&self, category: SkillCategory) -> f64 {
        self.category(category).match_rate()
    }

    /// All matched JD terms across categories, in category order.
    pub fn matched_terms(&self) -> Vec<&str> {
        SkillCategory::ALL
            .iter()
            .flat_map(|c| self.category(*c).matched.iter().map(String::as_str))
            .collect()
    }
}

#[derive(Default)]
pub struct MatchComparator {
    gate: RelevanceGate,
}

impl MatchComparator {
    pub fn new(gate: RelevanceGate) -> Self {
        Self { gate }
    }

    /// Compares a CV skill set against a JD skill set.
    ///
    /// Both inputs must already be normalized; an empty or non-normalized term is rejected
    /// with `EngineError::MalformedInput`. No matches at all is a valid result.
    pub fn compare(&self, cv: &SkillSet, jd: &SkillSet) -> Result<ComparisonResult, EngineError> {
        check_normalized("cv", cv)?;
        check_normalized("jd", jd)?;

        let technical = self.compare_category(SkillCategory::Technical, cv, jd);
        let soft = self.compare_category(SkillCategory::Soft, cv, jd);
        let domain = self.compare_category(SkillCategory::Domain, cv, jd);

        let total_jd_requirements = technical.total + soft.total + domain.total;
        let total_matches = technical.matched.len() + soft.matched.len() + domain.matched.len();

        Ok(ComparisonResult {
            technical,
            soft,
            domain,
            match_summary: MatchSummary {
                total_jd_requirements,
                total_matches,
                match_percentage: percentage(total_matches, total_jd_requirements),
            },
        })
    }

    fn compare_category(
        &self,
        category: SkillCategory,
        cv: &SkillSet,
        jd: &SkillSet,
    ) -> CategoryComparison {
        let cv_terms = cv.category(category);
        let jd_terms = jd.category(category);
        let mut result = CategoryComparison {
            total: jd_terms.len(),
            ..Default::default()
        };

        for jd_term in jd_terms {
            if cv_terms.contains(jd_term) {
                result.matched.insert(jd_term.clone());
                result.evidence.push(MatchEvidence {
                    jd_term: jd_term.clone(),
                    cv_term: jd_term.clone(),
                    kind: MatchKind::Exact,
                });
                continue;
            }

            let mut best: Option<(MatchKind, &String)> = None;
            let mut rejections = Vec::new();
            for cv_term in cv_terms {
                match self.gate.evaluate(category, jd_term, cv_term) {
                    GateVerdict::Accept(kind) => {
                        if best.map_or(true, |(current, _)| kind < current) {
                            best = Some((kind, cv_term));
                        }
                    }
                    GateVerdict::Reject(reason) => rejections.push(GateRejection {
                        jd_term: jd_term.clone(),
                        cv_term: cv_term.clone(),
                        reason,
                    }),
                    GateVerdict::Unrelated => {}
                }
            }

            match best {
                Some((kind, cv_term)) => {
                    result.matched.insert(jd_term.clone());
                    result.evidence.push(MatchEvidence {
                        jd_term: jd_term.clone(),
                        cv_term: cv_term.clone(),
                        kind,
                    });
                }
                None => {
                    result.missing.insert(jd_term.clone());
                    result.gate_rejections.extend(rejections);
                }
            }
        }

        result
    }
}

fn check_normalized(side: &str, set: &SkillSet) -> Result<(), EngineError> {
    for category in SkillCategory::ALL {
        if let Some(bad) = set.category(category).iter().find(|t| !is_normalized(t)) {
            return Err(EngineError::MalformedInput(if bad.trim().is_empty() {
                format!("{side} {category} skills contain an empty entry")
            } else {
                format!("{side} {category} skill '{bad}' is not normalized")
            }));
        }
    }
    Ok(())
}

pub(crate) fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(part as f64 / total as f64 * 100.0)
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
