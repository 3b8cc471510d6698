//! Skill Set — the normalized skill profile shared by CVs and job descriptions.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The three skill categories every profile is split into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillCategory {
    Technical,
    Soft,
    Domain,
}

impl SkillCategory {
    pub const ALL: [SkillCategory; 3] = [
        SkillCategory::Technical,
        SkillCategory::Soft,
        SkillCategory::Domain,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SkillCategory::Technical => "technical",
            SkillCategory::Soft => "soft",
            SkillCategory::Domain => "domain",
        }
    }
}

impl fmt::Display for SkillCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized skill profile. Each category is a set, so duplicates cannot exist and
/// iteration order is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillSet {
    #[serde(default)]
    pub technical: BTreeSet<String>,
    #[serde(default)]
    pub soft: BTreeSet<String>,
    #[serde(default)]
    pub domain: BTreeSet<String>,
}

impl SkillSet {
    /// Builds a skill set from raw extractor output, normalizing every term and
    /// dropping blanks.
    pub fn from_raw<T, S, D>(technical: T, soft: S, domain: D) -> Self
    where
        T: IntoIterator,
        T::Item: AsRef<str>,
        S: IntoIterator,
        S::Item: AsRef<str>,
        D: IntoIterator,
        D::Item: AsRef<str>,
    {
        Self {
            technical: normalize_all(technical),
            soft: normalize_all(soft),
            domain: normalize_all(domain),
        }
    }

    pub fn category(&self, category: SkillCategory) -> &BTreeSet<String> {
        match category {
            SkillCategory::Technical => &self.technical,
            SkillCategory::Soft => &self.soft,
            SkillCategory::Domain => &self.domain,
        }
    }

    pub fn total_len(&self) -> usize {
        self.technical.len() + self.soft.len() + self.domain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_len() == 0
    }
}

/// Case-folds, trims, and collapses internal whitespace. Returns `None` for blank input.
pub fn normalize_term(raw: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed.to_lowercase())
    }
}

/// True when `term` is already in the form `normalize_term` would produce.
pub fn is_normalized(term: &str) -> bool {
    normalize_term(term).as_deref() == Some(term)
}

fn normalize_all<I>(terms: I) -> BTreeSet<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    terms
        .into_iter()
        .filter_map(|t| normalize_term(t.as_ref()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_trims_and_folds_case() {
        assert_eq!(normalize_term("  Python "), Some("python".to_string()));
        assert_eq!(
            normalize_term("Machine\t  Learning"),
            Some("machine learning".to_string())
        );
    }

    #[test]
    fn test_normalize_blank_is_none() {
        assert_eq!(normalize_term("   "), None);
        assert_eq!(normalize_term(""), None);
    }

    #[test]
    fn test_from_raw_dedupes_after_normalization() {
        let set = SkillSet::from_raw(["SQL", "sql ", " Sql"], ["Teamwork"], Vec::<&str>::new());
        assert_eq!(set.technical.len(), 1);
        assert!(set.technical.contains("sql"));
        assert_eq!(set.total_len(), 2);
    }

    #[test]
    fn test_from_raw_drops_blank_entries() {
        let set = SkillSet::from_raw(["", "  ", "rust"], Vec::<&str>::new(), Vec::<&str>::new());
        assert_eq!(set.technical.len(), 1);
    }

    #[test]
    fn test_is_normalized() {
        assert!(is_normalized("data science"));
        assert!(!is_normalized("Data Science"));
        assert!(!is_normalized(" rust"));
        assert!(!is_normalized(""));
    }

    #[test]
    fn test_missing_categories_deserialize_as_empty() {
        let set: SkillSet = serde_json::from_str(r#"{"technical": ["rust"]}"#).unwrap();
        assert!(set.soft.is_empty());
        assert!(set.domain.is_empty());
    }
}
