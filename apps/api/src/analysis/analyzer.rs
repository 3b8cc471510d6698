//! Component Analyzer — fans the sub-analyses out to the AI capability and fans them back in.
//!
//! Every component runs as its own task with its own timeout. A failed, timed-out, or
//! unusable component is recorded in `ComponentReport::failures`; only when fewer than
//! `min_successes` components survive does the whole analysis fail.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::analysis::components::{
    ComponentFailure, ComponentName, ComponentReport, ComponentScore, FailureReason, RawFindings,
};
use crate::analysis::prompts::{component_instructions, render, COMPONENT_PROMPT_TEMPLATE};
use crate::errors::EngineError;
use crate::llm_client::prompts::{EVIDENCE_INSTRUCTION, JSON_ONLY_SYSTEM};
use crate::llm_client::{parse_json_response, TextCapability};
use crate::matching::ComparisonResult;

/// Shape the capability is asked to return for each component.
#[derive(Debug, Deserialize)]
struct RawComponentResponse {
    score: f64,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    gaps: Vec<String>,
    #[serde(default)]
    findings: serde_json::Value,
}

pub struct ComponentAnalyzer {
    capability: Arc<dyn TextCapability>,
    components: Vec<ComponentName>,
    min_successes: usize,
    timeout: Duration,
}

impl ComponentAnalyzer {
    pub fn new(capability: Arc<dyn TextCapability>, min_successes: usize, timeout: Duration) -> Self {
        Self {
            capability,
            components: ComponentName::ALL.to_vec(),
            min_successes,
            timeout,
        }
    }

    /// Runs every component concurrently and waits for all of them.
    ///
    /// Results are keyed by component name, so completion order never affects the report.
    pub async fn analyze(
        &self,
        cv_text: &str,
        jd_text: &str,
        comparison: &ComparisonResult,
    ) -> Result<ComponentReport, EngineError> {
        let matched_json =
            serde_json::to_string(&comparison.matched_terms()).unwrap_or_else(|_| "[]".to_string());

        let mut tasks = JoinSet::new();
        for &name in &self.components {
            let capability = Arc::clone(&self.capability);
            let focus = component_instructions(name);
            let prompt = render(
                COMPONENT_PROMPT_TEMPLATE,
                &[
                    ("focus", focus.as_str()),
                    ("matched_json", matched_json.as_str()),
                    ("cv_text", cv_text),
                    ("jd_text", jd_text),
                ],
            );
            let instructions = format!("{JSON_ONLY_SYSTEM} {EVIDENCE_INSTRUCTION} {focus}");
            let timeout = self.timeout;

            tasks.spawn(async move {
                let outcome =
                    run_component(capability.as_ref(), name, &prompt, &instructions, timeout).await;
                (name, outcome)
            });
        }

        let mut report = ComponentReport {
            expected: self.components.clone(),
            ..Default::default()
        };

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, Ok(score))) => {
                    debug!("Component {name} scored {:.1}", score.score);
                    report.scores.insert(name, score);
                }
                Ok((name, Err(reason))) => {
                    warn!("Component {name} failed: {reason}");
                    report.failures.push(ComponentFailure { name, reason });
                }
                Err(e) => warn!("Component task aborted: {e}"),
            }
        }

        // A panicked task never reports its name; account for it explicitly.
        for &name in &self.components {
            let accounted =
                report.scores.contains_key(&name) || report.failures.iter().any(|f| f.name == name);
            if !accounted {
                report.failures.push(ComponentFailure {
                    name,
                    reason: FailureReason::Provider("analysis task aborted".to_string()),
                });
            }
        }
        report.failures.sort_by_key(|f| f.name);

        let succeeded = report.scores.len();
        if succeeded < self.min_successes {
            return Err(EngineError::InsufficientAnalysis {
                succeeded,
                expected: self.components.len(),
                required: self.min_successes,
                failed: report.failures.iter().map(|f| f.name.to_string()).collect(),
            });
        }

        info!(
            "Component analysis complete: {}/{} succeeded",
            succeeded,
            self.components.len()
        );
        Ok(report)
    }
}

async fn run_component(
    capability: &dyn TextCapability,
    name: ComponentName,
    prompt: &str,
    instructions: &str,
    timeout: Duration,
) -> Result<ComponentScore, FailureReason> {
    let text = match tokio::time::timeout(timeout, capability.complete(prompt, instructions)).await
    {
        Err(_) => return Err(FailureReason::Timeout),
        Ok(Err(e)) => return Err(FailureReason::Provider(e.to_string())),
        Ok(Ok(text)) => text,
    };
    parse_component(name, capability.provider(), &text)
}

/// Coerces a provider response into a `ComponentScore`. Anything unusable becomes a
/// failure reason so corrupt data never reaches aggregation.
fn parse_component(
    name: ComponentName,
    provider: &str,
    text: &str,
) -> Result<ComponentScore, FailureReason> {
    let raw: RawComponentResponse =
        parse_json_response(text).map_err(|e| FailureReason::Unparsable(e.to_string()))?;

    if !raw.score.is_finite() || !(0.0..=100.0).contains(&raw.score) {
        return Err(FailureReason::OutOfRange(raw.score));
    }

    Ok(ComponentScore {
        name,
        score: raw.score,
        strengths: raw.strengths,
        gaps: raw.gaps,
        findings: RawFindings {
            provider: provider.to_string(),
            data: raw.findings,
        },
    })
}
