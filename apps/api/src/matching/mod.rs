// Skill matching: the normalized skill model, the external extractor seam, and the
// comparator with its domain-relevance gate. No LLM calls outside extractor.rs.

pub mod comparator;
pub mod extractor;
pub mod prompts;
pub mod relevance;
pub mod skill_set;

pub use comparator::{ComparisonResult, MatchComparator};
pub use relevance::RelevanceGate;
pub use extractor::{DocumentKind, LlmSkillExtractor, SkillExtractor};
pub use skill_set::{SkillCategory, SkillSet};
