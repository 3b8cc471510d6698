//! Recommendation — a deterministic, actionable digest of one ATS calculation.

use serde::{Deserialize, Serialize};

use crate::analysis::ComponentName;
use crate::matching::{ComparisonResult, SkillCategory};
use crate::scoring::{AtsResult, CategoryStatus};

const MAX_PRIORITY_SKILLS: usize = 10;
const MAX_GAPS_PER_COMPONENT: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrioritySkill {
    pub skill: String,
    pub category: SkillCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentGap {
    pub component: ComponentName,
    pub gap: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub final_ats_score: f64,
    pub category_status: CategoryStatus,
    pub summary: String,
    /// Missing requirements to address first: technical, then domain, then soft.
    pub priority_skills: Vec<PrioritySkill>,
    pub component_gaps: Vec<ComponentGap>,
    pub confidence_score: f64,
    pub validation_passed: bool,
}

pub fn build_recommendation(comparison: &ComparisonResult, result: &AtsResult) -> Recommendation {
    let priority_skills: Vec<PrioritySkill> =
        [SkillCategory::Technical, SkillCategory::Domain, SkillCategory::Soft]
            .into_iter()
            .flat_map(|category| {
                comparison
                    .category(category)
                    .missing
                    .iter()
                    .map(move |skill| PrioritySkill {
                        skill: skill.clone(),
                        category,
                    })
            })
            .take(MAX_PRIORITY_SKILLS)
            .collect();

    let component_gaps = result
        .components
        .values()
        .flat_map(|score| {
            score
                .gaps
                .iter()
                .take(MAX_GAPS_PER_COMPONENT)
                .map(|gap| ComponentGap {
                    component: score.name,
                    gap: gap.clone(),
                })
        })
        .collect();

    let top: Vec<&str> = priority_skills
        .iter()
        .take(3)
        .map(|p| p.skill.as_str())
        .collect();
    let summary = summarize(result.category_status, result.final_ats_score, &top);

    Recommendation {
        final_ats_score: result.final_ats_score,
        category_status: result.category_status,
        summary,
        priority_skills,
        component_gaps,
        confidence_score: result.confidence_score,
        validation_passed: result.validation_passed,
    }
}

fn summarize(status: CategoryStatus, score: f64, top: &[&str]) -> String {
    let focus = if top.is_empty() {
        "no outstanding requirements".to_string()
    } else {
        top.join(", ")
    };
    match status {
        CategoryStatus::StrongFit => format!(
            "Strong fit ({score:.0}/100). The CV already covers the core requirements; apply as is."
        ),
        CategoryStatus::GoodFit => format!(
            "Good fit ({score:.0}/100). Tailor the CV to emphasise: {focus}."
        ),
        CategoryStatus::ModerateFit => format!(
            "Moderate fit ({score:.0}/100). Close the largest gaps before applying: {focus}."
        ),
        CategoryStatus::WeakFit => format!(
            "Weak fit ({score:.0}/100). Significant gaps: {focus}. Consider whether this role is the right target."
        ),
    }
}
