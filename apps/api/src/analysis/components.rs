//! Component model — the fixed set of sub-analyses and their bounded outputs.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The enumerated sub-analyses. Ordering is the dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentName {
    SkillsRelevance,
    ExperienceAlignment,
    IndustryFit,
    RoleSeniority,
    TechnicalDepth,
}

impl ComponentName {
    pub const ALL: [ComponentName; 5] = [
        ComponentName::SkillsRelevance,
        ComponentName::ExperienceAlignment,
        ComponentName::IndustryFit,
        ComponentName::RoleSeniority,
        ComponentName::TechnicalDepth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentName::SkillsRelevance => "skills_relevance",
            ComponentName::ExperienceAlignment => "experience_alignment",
            ComponentName::IndustryFit => "industry_fit",
            ComponentName::RoleSeniority => "role_seniority",
            ComponentName::TechnicalDepth => "technical_depth",
        }
    }
}

impl fmt::Display for ComponentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ComponentName::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown component '{s}'"))
    }
}

/// Provider output passed through untouched, tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFindings {
    pub provider: String,
    pub data: serde_json::Value,
}

/// Bounded result of one sub-analysis. `score` is always within [0, 100].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentScore {
    pub name: ComponentName,
    pub score: f64,
    pub strengths: Vec<String>,
    pub gaps: Vec<String>,
    pub findings: RawFindings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    Timeout,
    Provider(String),
    Unparsable(String),
    OutOfRange(f64),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Timeout => write!(f, "timed out"),
            FailureReason::Provider(msg) => write!(f, "provider error: {msg}"),
            FailureReason::Unparsable(msg) => write!(f, "unparsable response: {msg}"),
            FailureReason::OutOfRange(score) => write!(f, "score {score} outside [0, 100]"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentFailure {
    pub name: ComponentName,
    pub reason: FailureReason,
}

/// Fan-in result of the component analyzer. Every expected component is either in
/// `scores` or in `failures`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentReport {
    pub expected: Vec<ComponentName>,
    pub scores: BTreeMap<ComponentName, ComponentScore>,
    pub failures: Vec<ComponentFailure>,
}

impl ComponentReport {
    pub fn score_of(&self, name: ComponentName) -> Option<f64> {
        self.scores.get(&name).map(|s| s.score)
    }

    pub fn missing(&self) -> Vec<ComponentName> {
        self.failures.iter().map(|f| f.name).collect()
    }

    /// Fraction of expected components that produced a usable score.
    pub fn completeness(&self) -> f64 {
        if self.expected.is_empty() {
            return 0.0;
        }
        let present = self
            .expected
            .iter()
            .filter(|name| self.scores.contains_key(name))
            .count();
        present as f64 / self.expected.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_name_round_trips_through_str() {
        for name in ComponentName::ALL {
            assert_eq!(name.as_str().parse::<ComponentName>().unwrap(), name);
        }
        assert!("culture_fit".parse::<ComponentName>().is_err());
    }

    #[test]
    fn test_component_map_serializes_with_snake_case_keys() {
        let mut report = ComponentReport {
            expected: vec![ComponentName::TechnicalDepth],
            ..Default::default()
        };
        report.scores.insert(
            ComponentName::TechnicalDepth,
            ComponentScore {
                name: ComponentName::TechnicalDepth,
                score: 71.0,
                strengths: vec![],
                gaps: vec![],
                findings: RawFindings {
                    provider: "test".to_string(),
                    data: serde_json::Value::Null,
                },
            },
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["scores"]["technical_depth"]["score"], 71.0);
        let back: ComponentReport = serde_json::from_value(json).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn test_completeness_counts_only_expected_scores() {
        let report = ComponentReport {
            expected: ComponentName::ALL.to_vec(),
            scores: BTreeMap::new(),
            failures: vec![],
        };
        assert_eq!(report.completeness(), 0.0);
    }
}
