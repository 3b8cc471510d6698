//! In-process fakes shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::analysis::components::{ComponentFailure, FailureReason, RawFindings};
use crate::analysis::{ComponentName, ComponentReport, ComponentScore};
use crate::errors::EngineError;
use crate::llm_client::{LlmError, TextCapability};
use crate::matching::{ComparisonResult, DocumentKind, MatchComparator, SkillExtractor, SkillSet};

#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Fail(String),
    /// Never answers within any sane timeout.
    Hang,
}

/// A `TextCapability` that answers from a script. Rules are matched by marker substring
/// against the instructions and the prompt; the first match wins.
pub struct ScriptedCapability {
    rules: Vec<(String, Reply)>,
    fallback: Reply,
    calls: AtomicUsize,
}

impl ScriptedCapability {
    pub fn new(fallback: Reply) -> Self {
        Self {
            rules: Vec::new(),
            fallback,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn fixed(text: &str) -> Self {
        Self::new(Reply::Text(text.to_string()))
    }

    pub fn failing() -> Self {
        Self::new(Reply::Fail("provider unavailable".to_string()))
    }

    pub fn on(mut self, marker: impl Into<String>, reply: Reply) -> Self {
        self.rules.push((marker.into(), reply));
        self
    }

    pub fn on_component(self, name: ComponentName, reply: Reply) -> Self {
        self.on(format!("[component:{}]", name.as_str()), reply)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextCapability for ScriptedCapability {
    fn provider(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, prompt: &str, instructions: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self
            .rules
            .iter()
            .find(|(marker, _)| instructions.contains(marker) || prompt.contains(marker))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| self.fallback.clone());

        match reply {
            Reply::Text(text) => Ok(text),
            Reply::Fail(message) => Err(LlmError::Api {
                status: 503,
                message,
            }),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(LlmError::EmptyContent)
            }
        }
    }
}

/// Compares with the built-in relevance gate.
pub fn compare(cv: &SkillSet, jd: &SkillSet) -> Result<ComparisonResult, EngineError> {
    MatchComparator::default().compare(cv, jd)
}

/// A well-formed component response with the given score.
pub fn component_json(score: f64) -> String {
    json!({
        "score": score,
        "strengths": ["relevant experience"],
        "gaps": ["limited exposure to streaming systems"],
        "findings": {"evidence": ["cv section: experience"]}
    })
    .to_string()
}

pub fn component_score(name: ComponentName, value: f64) -> ComponentScore {
    ComponentScore {
        name,
        score: value,
        strengths: vec![],
        gaps: vec!["limited exposure to streaming systems".to_string()],
        findings: RawFindings {
            provider: "test".to_string(),
            data: serde_json::Value::Null,
        },
    }
}

/// A report where the listed components scored and every other one timed out.
pub fn report_with(values: &[(ComponentName, f64)]) -> ComponentReport {
    let scores = values
        .iter()
        .map(|(n, v)| (*n, component_score(*n, *v)))
        .collect();
    let failures = ComponentName::ALL
        .iter()
        .filter(|n| !values.iter().any(|(m, _)| m == *n))
        .map(|n| ComponentFailure {
            name: *n,
            reason: FailureReason::Timeout,
        })
        .collect();
    ComponentReport {
        expected: ComponentName::ALL.to_vec(),
        scores,
        failures,
    }
}

pub fn uniform_report(value: f64) -> ComponentReport {
    report_with(&ComponentName::ALL.map(|n| (n, value)))
}

/// Returns fixed skill sets per document kind, or fails every call.
pub struct StaticExtractor {
    pub cv: SkillSet,
    pub jd: SkillSet,
    pub fail: bool,
}

impl StaticExtractor {
    pub fn new(cv: SkillSet, jd: SkillSet) -> Self {
        Self { cv, jd, fail: false }
    }

    pub fn failing() -> Self {
        Self {
            cv: SkillSet::default(),
            jd: SkillSet::default(),
            fail: true,
        }
    }
}

#[async_trait]
impl SkillExtractor for StaticExtractor {
    async fn extract(&self, _text: &str, kind: DocumentKind) -> Result<SkillSet, EngineError> {
        if self.fail {
            return Err(EngineError::Extraction("extractor offline".to_string()));
        }
        Ok(match kind {
            DocumentKind::Cv => self.cv.clone(),
            DocumentKind::JobDescription => self.jd.clone(),
        })
    }
}
