//! Scoring policy — the versioned weights and thresholds consumed by the aggregator.
//!
//! Loaded once at startup (`SCORING_POLICY_PATH`, JSON) or taken from `Default`.
//! Aggregation code never carries its own weight or threshold literals.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analysis::ComponentName;
use crate::matching::relevance::GatePolicy;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("Failed to read scoring policy: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse scoring policy: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid scoring policy: {0}")]
    Invalid(String),
}

/// Weights of the two category scores in the final score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupWeights {
    pub hard_skills: f64,
    pub soft_domain: f64,
}

/// Blend for `cat1_score` (hard/technical fit).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardSkillBlend {
    pub technical_match: f64,
    pub technical_depth: f64,
    pub skills_relevance: f64,
}

/// Blend for `cat2_score` (soft/domain fit).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftDomainBlend {
    pub soft_match: f64,
    pub domain_match: f64,
    pub experience_alignment: f64,
    pub industry_fit: f64,
    pub role_seniority: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BonusPolicy {
    /// Hard cap on total bonus points.
    pub max_points: f64,
    pub points_per_signal: f64,
    /// `technical_depth` score at or above which depth counts as exceptional.
    pub exceptional_depth: f64,
    /// `role_seniority` score at or above which seniority counts as exceeding the role.
    pub transferable_seniority: f64,
}

/// Lower bounds (inclusive) for each status label; anything below `moderate_fit` is weak.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusThresholds {
    pub strong_fit: f64,
    pub good_fit: f64,
    pub moderate_fit: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryStatus {
    StrongFit,
    GoodFit,
    ModerateFit,
    WeakFit,
}

impl CategoryStatus {
    pub fn label(&self) -> &'static str {
        match self {
            CategoryStatus::StrongFit => "Strong fit",
            CategoryStatus::GoodFit => "Good fit",
            CategoryStatus::ModerateFit => "Moderate fit",
            CategoryStatus::WeakFit => "Weak fit",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringPolicy {
    pub version: String,
    pub group_weights: GroupWeights,
    pub hard_skill_blend: HardSkillBlend,
    pub soft_domain_blend: SoftDomainBlend,
    pub bonus: BonusPolicy,
    pub status_thresholds: StatusThresholds,
    /// Minimum number of successful components for an analysis to count.
    pub min_components: usize,
    /// Domain-relevance gate tuning; the built-in tables when omitted.
    #[serde(default)]
    pub relevance: GatePolicy,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            version: "2024.1".to_string(),
            group_weights: GroupWeights {
                hard_skills: 0.6,
                soft_domain: 0.4,
            },
            hard_skill_blend: HardSkillBlend {
                technical_match: 0.5,
                technical_depth: 0.25,
                skills_relevance: 0.25,
            },
            soft_domain_blend: SoftDomainBlend {
                soft_match: 0.15,
                domain_match: 0.15,
                experience_alignment: 0.3,
                industry_fit: 0.2,
                role_seniority: 0.2,
            },
            bonus: BonusPolicy {
                max_points: 10.0,
                points_per_signal: 4.0,
                exceptional_depth: 90.0,
                transferable_seniority: 90.0,
            },
            status_thresholds: StatusThresholds {
                strong_fit: 80.0,
                good_fit: 60.0,
                moderate_fit: 40.0,
            },
            min_components: 3,
            relevance: GatePolicy::default(),
        }
    }
}

impl ScoringPolicy {
    /// Loads and validates a policy from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, PolicyError> {
        let raw = std::fs::read_to_string(path)?;
        let policy: ScoringPolicy = serde_json::from_str(&raw)?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.version.trim().is_empty() {
            return Err(PolicyError::Invalid("version must not be empty".to_string()));
        }

        let g = &self.group_weights;
        let h = &self.hard_skill_blend;
        let s = &self.soft_domain_blend;
        let groups = [
            ("group_weights", vec![g.hard_skills, g.soft_domain]),
            (
                "hard_skill_blend",
                vec![h.technical_match, h.technical_depth, h.skills_relevance],
            ),
            (
                "soft_domain_blend",
                vec![
                    s.soft_match,
                    s.domain_match,
                    s.experience_alignment,
                    s.industry_fit,
                    s.role_seniority,
                ],
            ),
        ];
        for (name, weights) in &groups {
            if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
                return Err(PolicyError::Invalid(format!(
                    "{name} weights must be finite and non-negative"
                )));
            }
            if weights.iter().sum::<f64>() <= 0.0 {
                return Err(PolicyError::Invalid(format!(
                    "{name} weights must have a positive total"
                )));
            }
        }

        let b = &self.bonus;
        if !(0.0..=10.0).contains(&b.max_points) || b.points_per_signal < 0.0 {
            return Err(PolicyError::Invalid(
                "bonus.max_points must lie in [0, 10] and points_per_signal must be non-negative"
                    .to_string(),
            ));
        }

        let t = &self.status_thresholds;
        let descending = t.strong_fit > t.good_fit && t.good_fit > t.moderate_fit;
        let in_range = [t.strong_fit, t.good_fit, t.moderate_fit]
            .iter()
            .all(|v| (0.0..=100.0).contains(v));
        if !descending || !in_range {
            return Err(PolicyError::Invalid(
                "status thresholds must be strictly descending within [0, 100]".to_string(),
            ));
        }

        if self.min_components == 0 || self.min_components > ComponentName::ALL.len() {
            return Err(PolicyError::Invalid(format!(
                "min_components must be between 1 and {}",
                ComponentName::ALL.len()
            )));
        }

        self.relevance.validate().map_err(PolicyError::Invalid)?;

        Ok(())
    }

    pub fn classify(&self, score: f64) -> CategoryStatus {
        let t = &self.status_thresholds;
        match score {
            s if s >= t.strong_fit => CategoryStatus::StrongFit,
            s if s >= t.good_fit => CategoryStatus::GoodFit,
            s if s >= t.moderate_fit => CategoryStatus::ModerateFit,
            _ => CategoryStatus::WeakFit,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_default_policy_is_valid() {
        assert!(ScoringPolicy::default().validate().is_ok());
    }

    #[test]
    fn test_default_blends_sum_to_one() {
        let p = ScoringPolicy::default();
        let h = &p.hard_skill_blend;
        let s = &p.soft_domain_blend;
        let g = &p.group_weights;
        assert!((h.technical_match + h.technical_depth + h.skills_relevance - 1.0).abs() < 1e-9);
        assert!(
            (s.soft_match + s.domain_match + s.experience_alignment + s.industry_fit
                + s.role_seniority
                - 1.0)
                .abs()
                < 1e-9
        );
        assert!((g.hard_skills + g.soft_domain - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_classify_thresholds() {
        let p = ScoringPolicy::default();
        assert_eq!(p.classify(80.0), CategoryStatus::StrongFit);
        assert_eq!(p.classify(79.99), CategoryStatus::GoodFit);
        assert_eq!(p.classify(60.0), CategoryStatus::GoodFit);
        assert_eq!(p.classify(59.5), CategoryStatus::ModerateFit);
        assert_eq!(p.classify(40.0), CategoryStatus::ModerateFit);
        assert_eq!(p.classify(39.9), CategoryStatus::WeakFit);
        assert_eq!(p.classify(0.0), CategoryStatus::WeakFit);
    }

    #[test]
    fn test_negative_weight_rejected() {
        let mut p = ScoringPolicy::default();
        p.hard_skill_blend.technical_depth = -0.1;
        assert!(matches!(p.validate(), Err(PolicyError::Invalid(_))));
    }

    #[test]
    fn test_bonus_cap_above_ten_rejected() {
        let mut p = ScoringPolicy::default();
        p.bonus.max_points = 15.0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_unordered_thresholds_rejected() {
        let mut p = ScoringPolicy::default();
        p.status_thresholds.good_fit = 85.0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_quorum_out_of_range_rejected() {
        let mut p = ScoringPolicy::default();
        p.min_components = 6;
        assert!(p.validate().is_err());
        p.min_components = 0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_load_from_json_file() {
        let mut policy = ScoringPolicy::default();
        policy.version = "2025.2".to_string();
        policy.min_components = 4;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&policy).unwrap().as_bytes())
            .unwrap();

        let loaded = ScoringPolicy::from_json_file(file.path()).unwrap();
        assert_eq!(loaded, policy);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{\"version\": \"x\"}").unwrap();
        assert!(matches!(
            ScoringPolicy::from_json_file(file.path()),
            Err(PolicyError::Parse(_))
        ));
    }

    #[test]
    fn test_relevance_section_defaults_when_omitted() {
        let mut json = serde_json::to_value(ScoringPolicy::default()).unwrap();
        json.as_object_mut().unwrap().remove("relevance");

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.to_string().as_bytes()).unwrap();

        let loaded = ScoringPolicy::from_json_file(file.path()).unwrap();
        assert_eq!(loaded.relevance, GatePolicy::default());
    }

    #[test]
    fn test_invalid_gate_coverage_rejected() {
        let mut p = ScoringPolicy::default();
        p.relevance.min_coverage = 1.5;
        assert!(matches!(p.validate(), Err(PolicyError::Invalid(_))));
    }
}
