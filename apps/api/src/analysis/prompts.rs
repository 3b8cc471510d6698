// Component analysis prompt templates.
// One instruction per component; the shared template carries the documents.

use crate::analysis::components::ComponentName;

pub const COMPONENT_PROMPT_TEMPLATE: &str = r#"Assess the candidate for the role described below.

FOCUS: {focus}

SKILLS ALREADY MATCHED AGAINST THE JOB DESCRIPTION:
{matched_json}

CANDIDATE CV:
{cv_text}

JOB DESCRIPTION:
{jd_text}

OUTPUT SCHEMA (return exactly this structure):
{
  "score": number,           // 0 – 100
  "strengths": ["string"],
  "gaps": ["string"],
  "findings": {}             // any supporting detail
}"#;

/// Per-component instruction. The `[component:<name>]` tag identifies the request in logs.
pub fn component_instructions(name: ComponentName) -> String {
    let focus = match name {
        ComponentName::SkillsRelevance => {
            "How relevant the candidate's skills are to the listed requirements, \
             weighting required skills above nice-to-haves."
        }
        ComponentName::ExperienceAlignment => {
            "How closely the candidate's past responsibilities and achievements align \
             with the role's responsibilities."
        }
        ComponentName::IndustryFit => {
            "How well the candidate's industry and subject-matter background fits the \
             employer's industry."
        }
        ComponentName::RoleSeniority => {
            "Whether the candidate's seniority, scope, and leadership match the level \
             of the role. Transferable seniority from adjacent roles counts."
        }
        ComponentName::TechnicalDepth => {
            "The depth of the candidate's technical expertise in the role's core \
             technologies, beyond keyword presence."
        }
    };
    format!("[component:{}] {focus}", name.as_str())
}

/// Fills `{name}` placeholders in a single pass over the template. Substituted text is never
/// scanned again, so a document that happens to contain `{jd_text}` stays as written.
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open + 1..];
        let hit = values.iter().find(|(name, _)| {
            tail.strip_prefix(name)
                .is_some_and(|after| after.starts_with('}'))
        });
        match hit {
            Some((name, value)) => {
                out.push_str(value);
                rest = &tail[name.len() + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}
