//! Skill Extractor — turns free text into a normalized `SkillSet`.
//!
//! The engine only depends on the `SkillExtractor` trait. `LlmSkillExtractor` is the
//! production adapter; any provider or parse failure surfaces as `EngineError::Extraction`.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::errors::EngineError;
use crate::llm_client::{parse_json_response, TextCapability};
use crate::matching::prompts::{SKILL_EXTRACT_PROMPT, SKILL_EXTRACT_SYSTEM};
use crate::matching::skill_set::SkillSet;

/// Which kind of document is being extracted. Only changes the prompt wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Cv,
    JobDescription,
}

impl DocumentKind {
    fn label(&self) -> &'static str {
        match self {
            DocumentKind::Cv => "CV",
            DocumentKind::JobDescription => "job description",
        }
    }
}

#[async_trait]
pub trait SkillExtractor: Send + Sync {
    async fn extract(&self, text: &str, kind: DocumentKind) -> Result<SkillSet, EngineError>;
}

/// Raw extractor output before normalization.
#[derive(Debug, Deserialize)]
struct RawSkills {
    #[serde(default)]
    technical: Vec<String>,
    #[serde(default)]
    soft: Vec<String>,
    #[serde(default)]
    domain: Vec<String>,
}

pub struct LlmSkillExtractor {
    capability: Arc<dyn TextCapability>,
}

impl LlmSkillExtractor {
    pub fn new(capability: Arc<dyn TextCapability>) -> Self {
        Self { capability }
    }
}

#[async_trait]
impl SkillExtractor for LlmSkillExtractor {
    async fn extract(&self, text: &str, kind: DocumentKind) -> Result<SkillSet, EngineError> {
        let prompt = SKILL_EXTRACT_PROMPT
            .replace("{document_kind}", kind.label())
            .replace("{text}", text);

        let response = self
            .capability
            .complete(&prompt, SKILL_EXTRACT_SYSTEM)
            .await
            .map_err(|e| EngineError::Extraction(format!("{} extraction failed: {e}", kind.label())))?;

        let raw: RawSkills = parse_json_response(&response).map_err(|e| {
            EngineError::Extraction(format!("{} extraction returned invalid JSON: {e}", kind.label()))
        })?;

        let skills = SkillSet::from_raw(raw.technical, raw.soft, raw.domain);
        debug!(
            "Extracted {} skills from {} ({} technical, {} soft, {} domain)",
            skills.total_len(),
            kind.label(),
            skills.technical.len(),
            skills.soft.len(),
            skills.domain.len()
        );
        Ok(skills)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedCapability;

    #[tokio::test]
    async fn test_extracts_and_normalizes() {
        let capability = ScriptedCapability::fixed(
            r#"```json
            {"technical": ["Rust", " rust", "PostgreSQL"], "soft": ["Mentoring"], "domain": []}
            ```"#,
        );
        let extractor = LlmSkillExtractor::new(Arc::new(capability));

        let skills = extractor
            .extract("Senior Rust engineer ...", DocumentKind::Cv)
            .await
            .unwrap();

        assert_eq!(skills.technical.len(), 2);
        assert!(skills.technical.contains("rust"));
        assert!(skills.technical.contains("postgresql"));
        assert!(skills.soft.contains("mentoring"));
    }

    #[tokio::test]
    async fn test_invalid_json_is_extraction_error() {
        let extractor =
            LlmSkillExtractor::new(Arc::new(ScriptedCapability::fixed("Sorry, I cannot help")));
        let err = extractor
            .extract("text", DocumentKind::JobDescription)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Extraction(msg) if msg.contains("job description")));
    }

    #[tokio::test]
    async fn test_provider_failure_is_extraction_error() {
        let extractor = LlmSkillExtractor::new(Arc::new(ScriptedCapability::failing()));
        let err = extractor.extract("text", DocumentKind::Cv).await.unwrap_err();
        assert!(matches!(err, EngineError::Extraction(_)));
    }
}
