//! Score Aggregator — folds match rates and component scores into one ATS score.
//!
//! Every weight, threshold and bonus rule comes from `ScoringPolicy`. Components are looked
//! up by name, so the order in which the analyzer collected them never matters.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::analysis::{ComponentName, ComponentReport, ComponentScore};
use crate::matching::comparator::{round2, MatchSummary};
use crate::matching::{ComparisonResult, SkillCategory};
use crate::scoring::policy::{CategoryStatus, ScoringPolicy};
use crate::scoring::validator;

// ────────────────────────────────────────────────────────────────────────────
// Output data model
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryRates {
    pub technical: f64,
    pub soft: f64,
    pub domain: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtsResult {
    pub components: BTreeMap<ComponentName, ComponentScore>,
    pub missing_components: Vec<ComponentName>,
    pub category_match_rates: CategoryRates,
    pub match_summary: MatchSummary,
    pub cat1_score: f64,
    pub cat2_score: f64,
    pub bonus_points: f64,
    pub bonus_signals: Vec<String>,
    pub final_ats_score: f64,
    pub category_status: CategoryStatus,
    pub overall_assessment: String,
    /// Fraction of declared components that produced a usable score, in [0, 1].
    pub confidence_score: f64,
    pub validation_passed: bool,
    pub validation_issues: Vec<String>,
    pub policy_version: String,
    pub processing_time_ms: u64,
}

// ────────────────────────────────────────────────────────────────────────────
// Aggregator
// ────────────────────────────────────────────────────────────────────────────

pub struct Aggregator {
    policy: ScoringPolicy,
}

impl Aggregator {
    pub fn new(policy: ScoringPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    /// Builds the `AtsResult`. The validator runs first; a violation does not abort
    /// aggregation but is reported through `validation_passed` and `validation_issues`.
    ///
    /// `processing_time_ms` is left at zero for the caller to fill in.
    pub fn aggregate(&self, comparison: &ComparisonResult, report: &ComponentReport) -> AtsResult {
        let validation = validator::validate(comparison, report);
        let p = &self.policy;

        let rates = CategoryRates {
            technical: comparison.match_rate(SkillCategory::Technical),
            soft: comparison.match_rate(SkillCategory::Soft),
            domain: comparison.match_rate(SkillCategory::Domain),
        };
        let rate_if_required = |category: SkillCategory| {
            (comparison.category(category).total > 0).then(|| comparison.match_rate(category))
        };
        let component = |name: ComponentName| report.score_of(name);

        let h = &p.hard_skill_blend;
        let cat1 = blend(&[
            (h.technical_match, rate_if_required(SkillCategory::Technical)),
            (h.technical_depth, component(ComponentName::TechnicalDepth)),
            (h.skills_relevance, component(ComponentName::SkillsRelevance)),
        ]);

        let s = &p.soft_domain_blend;
        let cat2 = blend(&[
            (s.soft_match, rate_if_required(SkillCategory::Soft)),
            (s.domain_match, rate_if_required(SkillCategory::Domain)),
            (s.experience_alignment, component(ComponentName::ExperienceAlignment)),
            (s.industry_fit, component(ComponentName::IndustryFit)),
            (s.role_seniority, component(ComponentName::RoleSeniority)),
        ]);

        let g = &p.group_weights;
        let base = blend(&[(g.hard_skills, cat1), (g.soft_domain, cat2)])
            .unwrap_or(0.0)
            .clamp(0.0, 100.0);

        let bonus_signals = self.bonus_signals(comparison, report);
        let earned = (bonus_signals.len() as f64 * p.bonus.points_per_signal)
            .min(p.bonus.max_points)
            .max(0.0);
        // Never let the bonus carry the score past the ceiling.
        let bonus_points = earned.min(100.0 - base);
        let final_ats_score = round2((base + bonus_points).clamp(0.0, 100.0));

        let category_status = p.classify(final_ats_score);
        let missing_components = report.missing();
        let (validation_passed, validation_issues) = match &validation {
            Ok(()) => (true, Vec::new()),
            Err(e) => (false, e.issues()),
        };

        let overall_assessment = build_assessment(
            category_status,
            final_ats_score,
            comparison,
            report,
            validation_passed,
        );

        AtsResult {
            components: report.scores.clone(),
            missing_components,
            category_match_rates: rates,
            match_summary: comparison.match_summary.clone(),
            cat1_score: round2(cat1.unwrap_or(0.0)),
            cat2_score: round2(cat2.unwrap_or(0.0)),
            bonus_points: round2(bonus_points),
            bonus_signals,
            final_ats_score,
            category_status,
            overall_assessment,
            confidence_score: round2(report.completeness()),
            validation_passed,
            validation_issues,
            policy_version: p.version.clone(),
            processing_time_ms: 0,
        }
    }

    fn bonus_signals(&self, comparison: &ComparisonResult, report: &ComponentReport) -> Vec<String> {
        let b = &self.policy.bonus;
        let mut signals = Vec::new();

        if report
            .score_of(ComponentName::TechnicalDepth)
            .is_some_and(|s| s >= b.exceptional_depth)
        {
            signals.push("exceptional technical depth".to_string());
        }
        if report
            .score_of(ComponentName::RoleSeniority)
            .is_some_and(|s| s >= b.transferable_seniority)
        {
            signals.push("transferable seniority".to_string());
        }
        let technical = &comparison.technical;
        if technical.total > 0 && technical.matched.len() == technical.total {
            signals.push("complete technical coverage".to_string());
        }

        signals
    }
}

/// Weighted average over the present terms only. `None` when no term with a positive
/// weight is present.
fn blend(terms: &[(f64, Option<f64>)]) -> Option<f64> {
    let (weighted, total_weight) = terms
        .iter()
        .filter_map(|(w, v)| v.map(|v| (*w, v)))
        .filter(|(w, _)| *w > 0.0)
        .fold((0.0, 0.0), |(sum, tw), (w, v)| (sum + w * v, tw + w));

    (total_weight > 0.0).then(|| weighted / total_weight)
}

/// Builds a human-readable assessment from the status, counts and gaps.
fn build_assessment(
    status: CategoryStatus,
    score: f64,
    comparison: &ComparisonResult,
    report: &ComponentReport,
    validation_passed: bool,
) -> String {
    let summary = &comparison.match_summary;
    let mut text = format!(
        "{} ({score:.0}/100). Matched {} of {} requirements ({:.1}%).",
        status.label(),
        summary.total_matches,
        summary.total_jd_requirements,
        summary.match_percentage
    );

    let top_gaps: Vec<&str> = [SkillCategory::Technical, SkillCategory::Domain, SkillCategory::Soft]
        .iter()
        .flat_map(|c| comparison.category(*c).missing.iter().map(String::as_str))
        .take(3)
        .collect();
    if !top_gaps.is_empty() {
        text.push_str(&format!(" Key gaps: {}.", top_gaps.join(", ")));
    }

    let missing = report.missing();
    if !missing.is_empty() {
        text.push_str(&format!(
            " Based on {} of {} analyses.",
            report.scores.len(),
            report.expected.len()
        ));
    }
    if !validation_passed {
        text.push_str(" Result failed consistency checks; treat it with caution.");
    }
    text
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::SkillSet;
    use crate::testing::{compare, report_with, uniform_report};

    /// Technical 1/2, soft 1/1, domain 0/1.
    fn comparison() -> ComparisonResult {
        let cv = SkillSet::from_raw(["rust"], ["mentoring"], Vec::<&str>::new());
        let jd = SkillSet::from_raw(["rust", "kafka"], ["mentoring"], ["payments"]);
        compare(&cv, &jd).unwrap()
    }

    fn aggregator() -> Aggregator {
        Aggregator::new(ScoringPolicy::default())
    }

    #[test]
    fn test_category_scores_follow_policy_blend() {
        let result = aggregator().aggregate(&comparison(), &uniform_report(60.0));

        // cat1 = 0.5*50 + 0.25*60 + 0.25*60
        assert!((result.cat1_score - 55.0).abs() < 1e-9);
        // cat2 = 0.15*100 + 0.15*0 + (0.3 + 0.2 + 0.2)*60
        assert!((result.cat2_score - 57.0).abs() < 1e-9);
        // 0.6*55 + 0.4*57
        assert!((result.final_ats_score - 55.8).abs() < 1e-9);
        assert_eq!(result.bonus_points, 0.0);
        assert_eq!(result.category_status, CategoryStatus::ModerateFit);
        assert!(result.validation_passed);
        assert_eq!(result.confidence_score, 1.0);
        assert_eq!(result.policy_version, "2024.1");
    }

    #[test]
    fn test_final_score_bounded_for_extreme_inputs() {
        let cv = SkillSet::from_raw(["rust"], Vec::<&str>::new(), Vec::<&str>::new());
        let jd = SkillSet::from_raw(["rust"], Vec::<&str>::new(), Vec::<&str>::new());
        let perfect = compare(&cv, &jd).unwrap();

        let high = aggregator().aggregate(&perfect, &uniform_report(100.0));
        assert_eq!(high.final_ats_score, 100.0);
        assert_eq!(high.bonus_points, 0.0);
        assert_eq!(high.bonus_signals.len(), 3);

        let low = aggregator().aggregate(&ComparisonResult::default(), &uniform_report(0.0));
        assert_eq!(low.final_ats_score, 0.0);
        assert_eq!(low.category_status, CategoryStatus::WeakFit);
    }

    #[test]
    fn test_bonus_is_capped() {
        let mut policy = ScoringPolicy::default();
        policy.bonus.points_per_signal = 6.0;
        let cv = SkillSet::from_raw(["rust"], Vec::<&str>::new(), Vec::<&str>::new());
        let jd = SkillSet::from_raw(["rust"], ["mentoring"], ["payments"]);
        let comparison = compare(&cv, &jd).unwrap();
        let report = report_with(&[
            (ComponentName::TechnicalDepth, 95.0),
            (ComponentName::RoleSeniority, 95.0),
            (ComponentName::SkillsRelevance, 20.0),
            (ComponentName::ExperienceAlignment, 20.0),
            (ComponentName::IndustryFit, 20.0),
        ]);

        let result = Aggregator::new(policy).aggregate(&comparison, &report);

        assert_eq!(result.bonus_signals.len(), 3);
        assert_eq!(result.bonus_points, 10.0);
    }

    #[test]
    fn test_bonus_does_not_push_past_ceiling() {
        let cv = SkillSet::from_raw(["rust"], ["mentoring"], ["payments"]);
        let jd = cv.clone();
        let comparison = compare(&cv, &jd).unwrap();
        let report = uniform_report(97.0);

        let result = aggregator().aggregate(&comparison, &report);

        assert!(result.final_ats_score <= 100.0);
        assert!(result.bonus_points <= 10.0);
        assert!((result.final_ats_score - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_status_thresholds_come_from_policy() {
        let mut policy = ScoringPolicy::default();
        policy.status_thresholds.strong_fit = 50.0;
        policy.status_thresholds.good_fit = 30.0;
        policy.status_thresholds.moderate_fit = 10.0;

        let result = Aggregator::new(policy).aggregate(&comparison(), &uniform_report(60.0));
        assert_eq!(result.category_status, CategoryStatus::StrongFit);
    }

    #[test]
    fn test_partial_failure_uses_available_components_only() {
        let report = report_with(&[
            (ComponentName::SkillsRelevance, 80.0),
            (ComponentName::ExperienceAlignment, 70.0),
            (ComponentName::TechnicalDepth, 60.0),
        ]);

        let result = aggregator().aggregate(&comparison(), &report);

        // cat1 = 0.5*50 + 0.25*60 + 0.25*80
        assert!((result.cat1_score - 60.0).abs() < 1e-9);
        // cat2 renormalizes over soft 0.15, domain 0.15, experience 0.3
        let expected_cat2 = (0.15 * 100.0 + 0.15 * 0.0 + 0.3 * 70.0) / 0.6;
        assert!((result.cat2_score - round2(expected_cat2)).abs() < 1e-9);
        assert!((result.confidence_score - 0.6).abs() < 1e-9);
        assert_eq!(
            result.missing_components,
            vec![ComponentName::IndustryFit, ComponentName::RoleSeniority]
        );
        assert!(result.validation_passed);
        assert!(result.overall_assessment.contains("Based on 3 of 5 analyses"));
    }

    #[test]
    fn test_aggregation_is_independent_of_component_order() {
        let forward = report_with(&ComponentName::ALL.map(|n| (n, 40.0 + n as u8 as f64 * 10.0)));
        let mut reversed_values = ComponentName::ALL.map(|n| (n, 40.0 + n as u8 as f64 * 10.0));
        reversed_values.reverse();
        let reversed = report_with(&reversed_values);

        let a = aggregator().aggregate(&comparison(), &forward);
        let b = aggregator().aggregate(&comparison(), &reversed);
        assert_eq!(a, b);
    }

    #[test]
    fn test_validation_failure_is_flagged_not_raised() {
        let mut comparison = comparison();
        comparison.technical.missing.clear();

        let result = aggregator().aggregate(&comparison, &uniform_report(60.0));

        assert!(!result.validation_passed);
        assert!(result.validation_issues[0].contains("expected 2 requirements, found 1"));
        assert!(result.overall_assessment.contains("consistency checks"));
    }

    #[test]
    fn test_category_without_requirements_is_left_out_of_blend() {
        let cv = SkillSet::from_raw(["rust"], Vec::<&str>::new(), Vec::<&str>::new());
        let jd = SkillSet::from_raw(["rust"], Vec::<&str>::new(), Vec::<&str>::new());
        let comparison = compare(&cv, &jd).unwrap();

        let result = aggregator().aggregate(&comparison, &uniform_report(50.0));

        // No soft/domain requirements: cat2 is the component blend alone.
        assert!((result.cat2_score - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_assessment_lists_technical_gaps_first() {
        let result = aggregator().aggregate(&comparison(), &uniform_report(60.0));
        assert!(result.overall_assessment.starts_with("Moderate fit (56/100)"));
        assert!(result.overall_assessment.contains("Key gaps: kafka, payments."));
    }
}
