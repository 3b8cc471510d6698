//! Domain-relevance gate — decides whether a non-exact pairing of a JD requirement with a
//! CV term counts as a match.
//!
//! The gate is precision-biased. Over-matching silently inflates the final score, so any
//! pairing that is not clearly the same skill is rejected.
//!
//! # Rules (JD term `j`, CV term `c`)
//! 1. `j == c` → exact.
//! 2. Both resolve to the same canonical form in the alias table → synonym.
//! 3. `j`'s tokens form a contiguous run inside `c` (the CV term is at least as specific)
//!    → contained, accepted only if:
//!    - `j` has at least one non-generic token,
//!    - `j` covers at least `min_coverage` of `c`'s tokens,
//!    - for the domain category, every token of `j` is non-generic.
//! 4. `c`'s tokens form a run inside `j` (a broad CV term against a specific requirement)
//!    → always rejected.
//!
//! Character-level substrings never count: `java` does not match `javascript`.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::matching::skill_set::SkillCategory;

/// How a JD requirement was matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Synonym,
    Contained,
}

/// Why the gate refused a candidate pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// The CV term is broader than the requirement.
    BroadCvTerm,
    /// The requirement consists only of generic words.
    GenericRequirement,
    /// The requirement covers too little of the CV term.
    LowCoverage,
    /// Domain requirements may not lean on generic words at all.
    GenericDomainToken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateVerdict {
    Accept(MatchKind),
    Reject(RejectReason),
    /// The two terms share no token structure; not a candidate at all.
    Unrelated,
}

/// Curated alias → canonical pairs. Both sides are already normalized.
const ALIASES: &[(&str, &str)] = &[
    ("js", "javascript"),
    ("ts", "typescript"),
    ("golang", "go"),
    ("k8s", "kubernetes"),
    ("postgres", "postgresql"),
    ("mssql", "sql server"),
    ("node", "node.js"),
    ("nodejs", "node.js"),
    ("reactjs", "react"),
    ("react.js", "react"),
    ("vuejs", "vue"),
    ("vue.js", "vue"),
    ("sklearn", "scikit-learn"),
    ("ml", "machine learning"),
    ("dl", "deep learning"),
    ("ai", "artificial intelligence"),
    ("nlp", "natural language processing"),
    ("aws", "amazon web services"),
    ("gcp", "google cloud platform"),
    ("ci/cd", "continuous integration"),
    ("oop", "object-oriented programming"),
    ("restful", "rest"),
    ("rest api", "rest"),
    ("restful api", "rest"),
    ("teamwork", "collaboration"),
    ("team collaboration", "collaboration"),
    ("communication skills", "communication"),
    ("leadership skills", "leadership"),
    ("problem-solving", "problem solving"),
    ("fintech", "financial technology"),
    ("ecommerce", "e-commerce"),
    ("saas", "software as a service"),
];

/// Words too broad to carry a match on their own.
const GENERIC_TOKENS: &[&str] = &[
    "and", "of", "for", "the", "in", "&", "a", "an", "with",
    "data", "science", "sciences", "management", "development", "engineering",
    "analysis", "analytics", "research", "system", "systems", "skill", "skills",
    "technology", "technologies", "service", "services", "business", "operations",
    "solutions", "international", "general", "applied", "theoretical", "studies",
    "design", "tools", "experience", "knowledge", "programming", "software",
    "computer", "industry", "sector", "field", "work", "professional",
];

const DEFAULT_MIN_COVERAGE: f64 = 0.5;

/// Tunable inputs of the gate. Ships as part of the scoring policy so the boundary can be
/// adjusted without a rebuild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatePolicy {
    /// Alias → canonical form, both normalized.
    pub aliases: BTreeMap<String, String>,
    pub generic_tokens: BTreeSet<String>,
    /// Share of the CV term's tokens a contained requirement must cover, in (0, 1].
    pub min_coverage: f64,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self {
            aliases: ALIASES
                .iter()
                .map(|(alias, canonical)| (alias.to_string(), canonical.to_string()))
                .collect(),
            generic_tokens: GENERIC_TOKENS.iter().map(|t| t.to_string()).collect(),
            min_coverage: DEFAULT_MIN_COVERAGE,
        }
    }
}

impl GatePolicy {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.min_coverage > 0.0 && self.min_coverage <= 1.0) {
            return Err("relevance.min_coverage must lie in (0, 1]".to_string());
        }
        if let Some((alias, _)) = self
            .aliases
            .iter()
            .find(|(alias, canonical)| alias.trim().is_empty() || canonical.trim().is_empty())
        {
            return Err(format!("relevance alias '{alias}' has an empty side"));
        }
        Ok(())
    }
}

pub struct RelevanceGate {
    aliases: HashMap<String, String>,
    generic: HashSet<String>,
    min_coverage: f64,
}

impl Default for RelevanceGate {
    fn default() -> Self {
        Self::new(&GatePolicy::default())
    }
}

impl RelevanceGate {
    pub fn new(policy: &GatePolicy) -> Self {
        Self {
            aliases: policy
                .aliases
                .iter()
                .map(|(alias, canonical)| (alias.clone(), canonical.clone()))
                .collect(),
            generic: policy.generic_tokens.iter().cloned().collect(),
            min_coverage: policy.min_coverage,
        }
    }

    /// Evaluates a single (JD term, CV term) pairing within a category.
    pub fn evaluate(&self, category: SkillCategory, jd_term: &str, cv_term: &str) -> GateVerdict {
        if jd_term == cv_term {
            return GateVerdict::Accept(MatchKind::Exact);
        }
        if self.canonical(jd_term) == self.canonical(cv_term) {
            return GateVerdict::Accept(MatchKind::Synonym);
        }

        let jd_tokens = self.canonical_tokens(jd_term);
        let cv_tokens = self.canonical_tokens(cv_term);
        if jd_tokens.is_empty() || cv_tokens.is_empty() {
            return GateVerdict::Unrelated;
        }
        if jd_tokens == cv_tokens {
            // Same skill after per-token aliasing, e.g. "postgres tuning" vs "postgresql tuning".
            return GateVerdict::Accept(MatchKind::Synonym);
        }

        if contains_run(&cv_tokens, &jd_tokens) {
            return self.judge_contained(category, &jd_tokens, &cv_tokens);
        }
        if contains_run(&jd_tokens, &cv_tokens) {
            return GateVerdict::Reject(RejectReason::BroadCvTerm);
        }
        GateVerdict::Unrelated
    }

    fn judge_contained(
        &self,
        category: SkillCategory,
        jd_tokens: &[String],
        cv_tokens: &[String],
    ) -> GateVerdict {
        if jd_tokens.iter().all(|t| self.is_generic(t)) {
            return GateVerdict::Reject(RejectReason::GenericRequirement);
        }
        if category == SkillCategory::Domain && jd_tokens.iter().any(|t| self.is_generic(t)) {
            return GateVerdict::Reject(RejectReason::GenericDomainToken);
        }
        let coverage = jd_tokens.len() as f64 / cv_tokens.len() as f64;
        if coverage < self.min_coverage {
            return GateVerdict::Reject(RejectReason::LowCoverage);
        }
        GateVerdict::Accept(MatchKind::Contained)
    }

    fn canonical<'a>(&'a self, term: &'a str) -> &'a str {
        self.aliases.get(term).map(String::as_str).unwrap_or(term)
    }

    /// Tokenizes the canonical form of `term`, then expands token-level aliases.
    fn canonical_tokens(&self, term: &str) -> Vec<String> {
        tokenize(self.canonical(term))
            .flat_map(|token| match self.aliases.get(token) {
                Some(expansion) => tokenize(expansion).map(str::to_string).collect::<Vec<_>>(),
                None => vec![token.to_string()],
            })
            .collect()
    }

    fn is_generic(&self, token: &str) -> bool {
        self.generic.contains(token)
    }
}

fn tokenize(term: &str) -> impl Iterator<Item = &str> {
    term.split(|c: char| c.is_whitespace() || matches!(c, '/' | '-' | '_' | ',' | '(' | ')'))
        .filter(|t| !t.is_empty())
}

/// True when `needle` appears as a contiguous run inside `haystack` and is strictly shorter.
fn contains_run(haystack: &[String], needle: &[String]) -> bool {
    needle.len() < haystack.len() && haystack.windows(needle.len()).any(|w| w == needle)
}
