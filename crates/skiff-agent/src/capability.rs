// SPDX-FileCopyrightText: 2026 Skiff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agentic suitability of local models.
//!
//! Multi-step tool use needs a model that both calls tools reliably and is
//! large enough to plan. [`FamilyHeuristic`] judges that from the model name
//! alone: the family picks a minimum size and a capability level, and the
//! size comes from the tag (`qwen2.5-coder:14b` is 14B).

use strum::Display;

/// Parameter-count bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display)]
pub enum SizeTier {
    #[strum(serialize = "Tiny (<3B)")]
    Tiny,
    #[strum(serialize = "Small (3-7B)")]
    Small,
    #[strum(serialize = "Medium (7-14B)")]
    Medium,
    #[strum(serialize = "Large (14-32B)")]
    Large,
    #[strum(serialize = "XLarge (32B+)")]
    XLarge,
}

impl SizeTier {
    pub fn from_billions(size_b: f64) -> Self {
        match size_b {
            s if s < 3.0 => SizeTier::Tiny,
            s if s < 7.0 => SizeTier::Small,
            s if s < 14.0 => SizeTier::Medium,
            s if s < 32.0 => SizeTier::Large,
            _ => SizeTier::XLarge,
        }
    }
}

/// How much autonomy a family handles at its recommended size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display)]
pub enum AgenticLevel {
    None,
    #[strum(serialize = "Basic (1-2 steps)")]
    Basic,
    #[strum(serialize = "Good (multi-step)")]
    Good,
    #[strum(serialize = "Full (autonomous)")]
    Full,
}

struct FamilyProfile {
    family: &'static str,
    min_size: SizeTier,
    level: AgenticLevel,
}

const fn profile(family: &'static str, min_size: SizeTier, level: AgenticLevel) -> FamilyProfile {
    FamilyProfile {
        family,
        min_size,
        level,
    }
}

// Longer prefixes first: "qwen2.5-coder" must win over "qwen2.5" and "qwen2".
const FAMILIES: &[FamilyProfile] = &[
    profile("llama3.3", SizeTier::Large, AgenticLevel::Full),
    profile("llama3.2", SizeTier::Medium, AgenticLevel::Good),
    profile("llama3.1", SizeTier::Medium, AgenticLevel::Full),
    profile("qwen3-coder", SizeTier::Medium, AgenticLevel::Full),
    profile("qwen3", SizeTier::Small, AgenticLevel::Full),
    profile("qwen2.5-coder", SizeTier::Small, AgenticLevel::Full),
    profile("qwen2.5", SizeTier::Small, AgenticLevel::Good),
    profile("qwen2", SizeTier::Medium, AgenticLevel::Good),
    profile("mistral-small", SizeTier::Large, AgenticLevel::Full),
    profile("mistral-nemo", SizeTier::Medium, AgenticLevel::Full),
    profile("mistral", SizeTier::Medium, AgenticLevel::Good),
    profile("mixtral", SizeTier::Large, AgenticLevel::Good),
    profile("ministral", SizeTier::Small, AgenticLevel::Basic),
    profile("command-r-plus", SizeTier::XLarge, AgenticLevel::Full),
    profile("command-r", SizeTier::Large, AgenticLevel::Full),
    profile("deepseek-coder-v2", SizeTier::Large, AgenticLevel::Full),
    profile("deepseek-r1", SizeTier::Medium, AgenticLevel::Good),
    profile("granite3.2-vision", SizeTier::Medium, AgenticLevel::Good),
    profile("granite3.2", SizeTier::Medium, AgenticLevel::Good),
    profile("devstral-small-2", SizeTier::Large, AgenticLevel::Full),
    profile("devstral-2", SizeTier::XLarge, AgenticLevel::Full),
    profile("nemotron-3-nano", SizeTier::Large, AgenticLevel::Full),
    profile("firefunction-v2", SizeTier::Medium, AgenticLevel::Good),
    profile("functiongemma", SizeTier::Tiny, AgenticLevel::Basic),
    profile("smollm2", SizeTier::Tiny, AgenticLevel::None),
];

/// Model suggested when the configured one falls short.
pub const SUGGESTED_MODEL: &str = "qwen2.5-coder:7b";

/// Size in billions of parameters taken from the model tag, 7 if absent.
///
/// `llama3.2:3b` is 3, `qwen2.5-coder:14b-instruct-q4_K_M` is 14.
pub fn parse_model_size(model: &str) -> f64 {
    let lower = model.to_ascii_lowercase();
    let tag = match lower.split_once(':') {
        Some((_, tag)) => tag,
        None => lower.as_str(),
    };
    tag.split(['-', '_'])
        .filter_map(|part| part.strip_suffix('b'))
        .find_map(|digits| digits.parse::<f64>().ok())
        .filter(|size| *size > 0.0)
        .unwrap_or(7.0)
}

/// Family name without the tag, matched against known families.
pub fn model_family(model: &str) -> String {
    let lower = model.to_ascii_lowercase();
    let base = lower.split(':').next().unwrap_or_default();
    match find_profile(base) {
        Some(p) => p.family.to_string(),
        None => base.to_string(),
    }
}

fn find_profile(base: &str) -> Option<&'static FamilyProfile> {
    FAMILIES.iter().find(|p| base.starts_with(p.family))
}

/// Verdict on one model.
#[derive(Debug, Clone, PartialEq)]
pub struct CapabilityReport {
    pub suitable: bool,
    pub warning: Option<String>,
    pub recommendation: Option<String>,
    pub suggested_model: Option<String>,
}

impl CapabilityReport {
    fn suitable() -> Self {
        Self {
            suitable: true,
            warning: None,
            recommendation: None,
            suggested_model: None,
        }
    }

    fn caution(suitable: bool, warning: String, recommendation: String, suggest: &str) -> Self {
        Self {
            suitable,
            warning: Some(warning),
            recommendation: Some(recommendation),
            suggested_model: Some(suggest.to_string()),
        }
    }
}

/// Decides whether a model can drive a multi-step tool loop.
pub trait CapabilityCheck: Send + Sync {
    fn check(&self, model: &str) -> CapabilityReport;
}

/// Name-based heuristic over known model families.
#[derive(Debug, Clone, Copy, Default)]
pub struct FamilyHeuristic;

impl CapabilityCheck for FamilyHeuristic {
    fn check(&self, model: &str) -> CapabilityReport {
        let size = parse_model_size(model);
        let tier = SizeTier::from_billions(size);
        let lower = model.to_ascii_lowercase();
        let base = lower.split(':').next().unwrap_or_default();

        let Some(profile) = find_profile(base) else {
            if tier < SizeTier::Medium {
                return CapabilityReport::caution(
                    false,
                    format!("model {model} ({size}B) may struggle with agentic tasks"),
                    "7B+ recommended for agentic workflows".into(),
                    SUGGESTED_MODEL,
                );
            }
            return CapabilityReport::suitable();
        };

        if tier < profile.min_size {
            let suggest = match profile.family {
                "llama3.2" => "llama3.1:8b",
                _ => SUGGESTED_MODEL,
            };
            return CapabilityReport::caution(
                false,
                format!("model {model} ({size}B) is below recommended size for agentic tasks"),
                format!(
                    "use {} or larger for reliable agentic workflows",
                    profile.min_size
                ),
                suggest,
            );
        }

        match profile.level {
            AgenticLevel::None => CapabilityReport::caution(
                false,
                format!("model {model} is not capable of agentic tasks"),
                "use a tool-capable model like qwen2.5-coder or llama3.2".into(),
                SUGGESTED_MODEL,
            ),
            AgenticLevel::Basic => CapabilityReport::caution(
                true,
                format!("model {model} has basic agentic capability (1-2 steps only)"),
                "for complex multi-step tasks, consider upgrading".into(),
                "qwen2.5-coder:14b",
            ),
            AgenticLevel::Good | AgenticLevel::Full => CapabilityReport::suitable(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_from_tag() {
        assert_eq!(parse_model_size("llama3.2:3b"), 3.0);
        assert_eq!(parse_model_size("qwen2.5-coder:14b-instruct-q4_K_M"), 14.0);
        assert_eq!(parse_model_size("qwen2.5:1.5b"), 1.5);
        assert_eq!(parse_model_size("mistral:latest"), 7.0);
        assert_eq!(parse_model_size("mistral"), 7.0);
        assert_eq!(parse_model_size("codellama-70b"), 70.0);
    }

    #[test]
    fn family_prefers_longest_prefix() {
        assert_eq!(model_family("qwen2.5-coder:14b"), "qwen2.5-coder");
        assert_eq!(model_family("Qwen2.5:32b"), "qwen2.5");
        assert_eq!(model_family("mistral-nemo:12b"), "mistral-nemo");
        assert_eq!(model_family("phi4:14b"), "phi4");
    }

    #[test]
    fn size_tiers() {
        assert_eq!(SizeTier::from_billions(1.5), SizeTier::Tiny);
        assert_eq!(SizeTier::from_billions(3.0), SizeTier::Small);
        assert_eq!(SizeTier::from_billions(7.0), SizeTier::Medium);
        assert_eq!(SizeTier::from_billions(14.0), SizeTier::Large);
        assert_eq!(SizeTier::from_billions(70.0), SizeTier::XLarge);
    }

    #[test]
    fn coder_models_are_suitable() {
        let report = FamilyHeuristic.check("qwen2.5-coder:14b");
        assert!(report.suitable);
        assert!(report.warning.is_none());
    }

    #[test]
    fn small_llama_is_below_size() {
        let report = FamilyHeuristic.check("llama3.2:3b");
        assert!(!report.suitable);
        assert!(report.warning.unwrap().contains("below recommended size"));
        assert_eq!(report.suggested_model.as_deref(), Some("llama3.1:8b"));
    }

    #[test]
    fn basic_families_pass_with_warning() {
        let report = FamilyHeuristic.check("ministral:8b");
        assert!(report.suitable);
        assert!(report.warning.unwrap().contains("basic agentic capability"));
    }

    #[test]
    fn non_agentic_family_is_rejected() {
        assert!(!FamilyHeuristic.check("smollm2:1.7b").suitable);
    }

    #[test]
    fn unknown_families_fall_back_to_size() {
        assert!(FamilyHeuristic.check("phi4:14b").suitable);
        let report = FamilyHeuristic.check("tinyllama:1b");
        assert!(!report.suitable);
        assert!(report.warning.unwrap().contains("may struggle"));
    }
}
