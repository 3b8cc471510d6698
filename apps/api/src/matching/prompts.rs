// Skill extraction prompt templates.

pub const SKILL_EXTRACT_SYSTEM: &str = "\
You are a precise skill extractor for CVs and job descriptions. \
You MUST respond with valid JSON only — no markdown fences, no explanations. \
List each skill once, using its common short name. \
Never invent skills that the text does not mention.";

pub const SKILL_EXTRACT_PROMPT: &str = r#"Extract the skills mentioned in the following {document_kind}.

INPUT TEXT:
{text}

OUTPUT SCHEMA (return exactly this structure):
{
  "technical": ["string"],  // languages, frameworks, tools, platforms, methods
  "soft": ["string"],       // interpersonal and working-style skills
  "domain": ["string"]      // industries and subject-matter fields
}"#;
