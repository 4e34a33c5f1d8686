// SPDX-FileCopyrightText: 2026 Skiff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Heuristic query complexity classification.
//!
//! The router only depends on the [`ComplexityHeuristic`] trait. The default
//! [`KeywordHeuristic`] uses keyword and word-count rules: no model call,
//! no network, no latency.

use serde::Serialize;

use crate::tier::Tier;

/// Coarse difficulty of a query. Ordered easiest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ComplexityClass {
    Trivial,
    Simple,
    Moderate,
    Complex,
    Expert,
}

impl std::fmt::Display for ComplexityClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComplexityClass::Trivial => write!(f, "Trivial"),
            ComplexityClass::Simple => write!(f, "Simple"),
            ComplexityClass::Moderate => write!(f, "Moderate"),
            ComplexityClass::Complex => write!(f, "Complex"),
            ComplexityClass::Expert => write!(f, "Expert"),
        }
    }
}

impl ComplexityClass {
    /// Cheapest tier expected to answer this class adequately.
    pub fn min_tier(self) -> Tier {
        match self {
            ComplexityClass::Trivial => Tier::Cache,
            ComplexityClass::Simple => Tier::Local,
            ComplexityClass::Moderate | ComplexityClass::Complex | ComplexityClass::Expert => {
                Tier::Cloud
            }
        }
    }
}

/// What kind of answer a query is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum QueryType {
    Unknown,
    Lookup,
    Explanation,
    CodeGeneration,
    Refactoring,
    Architecture,
    Debugging,
    Review,
    Planning,
    General,
}

impl std::fmt::Display for QueryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            QueryType::Unknown => "Unknown",
            QueryType::Lookup => "Lookup",
            QueryType::Explanation => "Explanation",
            QueryType::CodeGeneration => "CodeGeneration",
            QueryType::Refactoring => "Refactoring",
            QueryType::Architecture => "Architecture",
            QueryType::Debugging => "Debugging",
            QueryType::Review => "Review",
            QueryType::Planning => "Planning",
            QueryType::General => "General",
        };
        f.write_str(name)
    }
}

impl QueryType {
    /// Model family hint: `fast`, `code` or `reasoning`.
    pub fn model_hint(self) -> &'static str {
        match self {
            QueryType::CodeGeneration | QueryType::Refactoring | QueryType::Debugging => "code",
            QueryType::Architecture | QueryType::Planning | QueryType::Review => "reasoning",
            QueryType::Unknown
            | QueryType::Lookup
            | QueryType::Explanation
            | QueryType::General => "fast",
        }
    }
}

/// Pluggable complexity strategy consulted by the router on cache miss.
pub trait ComplexityHeuristic: Send + Sync {
    fn classify_complexity(&self, query: &str) -> ComplexityClass;

    fn classify_type(&self, query: &str) -> QueryType;
}

const EXPERT_MARKERS: &[&str] = &[
    "architect",
    "design pattern",
    "trade-off",
    "best approach",
    "should i",
    "pros and cons",
];

const COMPLEX_MARKERS: &[&str] = &[
    "explain", "compare", "analyze", "implement", "refactor", "review", "code", "function", "bug",
    "error",
];

const MODERATE_MARKERS: &[&str] = &["how", "why", "debug", "fix"];

const SIMPLE_MARKERS: &[&str] = &["what is", "where is", "find", "list"];

/// Query-type rules, checked in order. First hit wins.
const TYPE_RULES: &[(QueryType, &[&str])] = &[
    (QueryType::Explanation, &["explain", "how does", "why "]),
    (
        QueryType::CodeGeneration,
        &["write", "create", "implement", "generate"],
    ),
    (QueryType::Refactoring, &["refactor", "improve", "optimize"]),
    (
        QueryType::Architecture,
        &["architect", "design", "should i", "trade-off"],
    ),
    (QueryType::Debugging, &["bug", "fix", "debug", "error"]),
    (QueryType::Review, &["review", "check"]),
    (QueryType::Planning, &["plan", "roadmap"]),
];

/// Keyword and word-count heuristic.
///
/// Thresholds are deliberately low so that anything beyond a short lookup
/// is treated as needing a capable model.
#[derive(Debug, Clone)]
pub struct KeywordHeuristic {
    /// More words than this makes a query Complex.
    complex_words: usize,
    /// More words than this makes a query Moderate.
    moderate_words: usize,
    /// At least this many words (without keywords) makes a query Moderate.
    trivial_words: usize,
}

impl KeywordHeuristic {
    pub fn new() -> Self {
        Self {
            complex_words: 15,
            moderate_words: 10,
            trivial_words: 5,
        }
    }

    fn contains_any(haystack: &str, needles: &[&str]) -> bool {
        needles.iter().any(|n| haystack.contains(n))
    }
}

impl Default for KeywordHeuristic {
    fn default() -> Self {
        Self::new()
    }
}

impl ComplexityHeuristic for KeywordHeuristic {
    fn classify_complexity(&self, query: &str) -> ComplexityClass {
        let lower = query.to_lowercase();
        let words = query.split_whitespace().count();

        if Self::contains_any(&lower, EXPERT_MARKERS) {
            ComplexityClass::Expert
        } else if Self::contains_any(&lower, COMPLEX_MARKERS) || words > self.complex_words {
            ComplexityClass::Complex
        } else if Self::contains_any(&lower, MODERATE_MARKERS) || words > self.moderate_words {
            ComplexityClass::Moderate
        } else if Self::contains_any(&lower, SIMPLE_MARKERS) {
            ComplexityClass::Simple
        } else if words >= self.trivial_words {
            ComplexityClass::Moderate
        } else {
            ComplexityClass::Trivial
        }
    }

    fn classify_type(&self, query: &str) -> QueryType {
        let lower = query.to_lowercase();

        if lower.contains("what is")
            || lower.contains("syntax")
            || lower.starts_with("list ")
            || lower.contains("first ")
        {
            return QueryType::Lookup;
        }

        TYPE_RULES
            .iter()
            .find(|(_, markers)| Self::contains_any(&lower, markers))
            .map(|(ty, _)| *ty)
            .unwrap_or(QueryType::General)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complexity(q: &str) -> ComplexityClass {
        KeywordHeuristic::new().classify_complexity(q)
    }

    fn query_type(q: &str) -> QueryType {
        KeywordHeuristic::new().classify_type(q)
    }

    #[test]
    fn arithmetic_lookup_is_simple() {
        assert_eq!(complexity("What is 2+2?"), ComplexityClass::Simple);
        assert_eq!(query_type("What is 2+2?"), QueryType::Lookup);
    }

    #[test]
    fn short_query_without_markers_is_trivial() {
        assert_eq!(complexity("hello there"), ComplexityClass::Trivial);
        assert_eq!(complexity(""), ComplexityClass::Trivial);
    }

    #[test]
    fn architecture_question_is_expert() {
        assert_eq!(
            complexity("Should I use an actor model here?"),
            ComplexityClass::Expert
        );
        assert_eq!(complexity("pros and cons of tokio"), ComplexityClass::Expert);
    }

    #[test]
    fn code_keywords_are_complex() {
        assert_eq!(complexity("refactor this"), ComplexityClass::Complex);
        assert_eq!(complexity("there is a bug"), ComplexityClass::Complex);
    }

    #[test]
    fn long_query_is_complex() {
        let q = "one two three four five six seven eight nine ten eleven twelve thirteen fourteen fifteen sixteen";
        assert_eq!(complexity(q), ComplexityClass::Complex);
    }

    #[test]
    fn how_questions_are_moderate() {
        assert_eq!(complexity("how do rivers form"), ComplexityClass::Moderate);
    }

    #[test]
    fn five_plain_words_are_moderate() {
        assert_eq!(
            complexity("tell me about the sea"),
            ComplexityClass::Moderate
        );
    }

    #[test]
    fn min_tier_mapping() {
        assert_eq!(ComplexityClass::Trivial.min_tier(), Tier::Cache);
        assert_eq!(ComplexityClass::Simple.min_tier(), Tier::Local);
        assert_eq!(ComplexityClass::Moderate.min_tier(), Tier::Cloud);
        assert_eq!(ComplexityClass::Expert.min_tier(), Tier::Cloud);
    }

    #[test]
    fn query_types() {
        assert_eq!(query_type("explain lifetimes"), QueryType::Explanation);
        assert_eq!(query_type("write a parser"), QueryType::CodeGeneration);
        assert_eq!(query_type("optimize this loop"), QueryType::Refactoring);
        assert_eq!(query_type("design the schema"), QueryType::Architecture);
        assert_eq!(query_type("fix the crash"), QueryType::Debugging);
        assert_eq!(query_type("check my config"), QueryType::Review);
        assert_eq!(query_type("roadmap for q3"), QueryType::Planning);
        assert_eq!(query_type("tell me a story"), QueryType::General);
    }

    #[test]
    fn model_hints() {
        assert_eq!(QueryType::Debugging.model_hint(), "code");
        assert_eq!(QueryType::Planning.model_hint(), "reasoning");
        assert_eq!(QueryType::General.model_hint(), "fast");
    }
}
