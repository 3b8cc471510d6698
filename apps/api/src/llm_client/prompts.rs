// Shared prompt constants and prompt-building utilities.
// Each module that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Common instruction appended to every analysis prompt.
pub const EVIDENCE_INSTRUCTION: &str = "\
    CRITICAL: Judge only from the CV and job description text provided. \
    Do NOT assume experience, credentials, or seniority that the CV does not state. \
    When evidence is missing, say so in `gaps` and lower the score accordingly.";
