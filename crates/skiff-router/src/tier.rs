// SPDX-FileCopyrightText: 2026 Skiff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Backend tiers and their cost attributes.
//!
//! Rates are cents per 1K tokens:
//!
//! | Tier         | Input | Output |
//! |--------------|-------|--------|
//! | Cache, Local | 0     | 0      |
//! | Auto, Cloud  | 0.03  | 0.15   |
//! | Haiku        | 0.025 | 0.125  |
//! | Sonnet       | 0.3   | 1.5    |
//! | Opus         | 1.5   | 7.5    |
//! | GPT-4o       | 0.25  | 1.0    |

use serde::Serialize;
use strum::{Display, EnumString};

/// Marker suffix for zero-cost cloud model identifiers.
pub const FREE_MODEL_SUFFIX: &str = ":free";

/// A backend/cost class a query can be routed to. Ordered cheapest first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, Serialize,
)]
#[strum(ascii_case_insensitive)]
pub enum Tier {
    #[strum(serialize = "cache", to_string = "Cache")]
    Cache,
    #[strum(serialize = "local", to_string = "Local")]
    Local,
    #[strum(serialize = "auto", to_string = "Auto")]
    Auto,
    #[strum(serialize = "cloud", to_string = "Cloud")]
    Cloud,
    #[strum(serialize = "haiku", to_string = "Haiku")]
    Haiku,
    #[strum(serialize = "sonnet", to_string = "Sonnet")]
    Sonnet,
    #[strum(serialize = "opus", to_string = "Opus")]
    Opus,
    #[strum(serialize = "gpt-4o", serialize = "gpt4o", to_string = "GPT-4o")]
    Gpt4o,
}

impl Tier {
    /// All tiers, cheapest first.
    pub const ALL: [Tier; 8] = [
        Tier::Cache,
        Tier::Local,
        Tier::Auto,
        Tier::Cloud,
        Tier::Haiku,
        Tier::Sonnet,
        Tier::Opus,
        Tier::Gpt4o,
    ];

    /// Served without leaving the machine.
    pub fn is_local(self) -> bool {
        matches!(self, Tier::Cache | Tier::Local)
    }

    /// Routed by the cloud auto-router.
    pub fn is_auto(self) -> bool {
        matches!(self, Tier::Auto | Tier::Cloud)
    }

    pub fn is_paid(self) -> bool {
        self >= Tier::Auto
    }

    pub fn order(self) -> u8 {
        self as u8
    }

    pub fn input_cost_per_1k(self) -> f64 {
        match self {
            Tier::Cache | Tier::Local => 0.0,
            Tier::Auto | Tier::Cloud => 0.03,
            Tier::Haiku => 0.025,
            Tier::Sonnet => 0.3,
            Tier::Opus => 1.5,
            Tier::Gpt4o => 0.25,
        }
    }

    pub fn output_cost_per_1k(self) -> f64 {
        match self {
            Tier::Cache | Tier::Local => 0.0,
            Tier::Auto | Tier::Cloud => 0.15,
            Tier::Haiku => 0.125,
            Tier::Sonnet => 1.5,
            Tier::Opus => 7.5,
            Tier::Gpt4o => 1.0,
        }
    }

    /// Cost in cents for the given token counts at this tier's rates.
    pub fn cost_cents(self, input_tokens: u32, output_tokens: u32) -> f64 {
        input_tokens as f64 / 1000.0 * self.input_cost_per_1k()
            + output_tokens as f64 / 1000.0 * self.output_cost_per_1k()
    }

    pub fn typical_latency_ms(self) -> u32 {
        match self {
            Tier::Cache => 1,
            Tier::Local => 500,
            Tier::Auto | Tier::Cloud => 1000,
            Tier::Haiku => 800,
            Tier::Sonnet => 1500,
            Tier::Opus => 3000,
            Tier::Gpt4o => 1200,
        }
    }

    /// Next tier up after a failure, if any.
    pub fn escalate(self) -> Option<Tier> {
        match self {
            Tier::Cache => Some(Tier::Local),
            Tier::Local => Some(Tier::Cloud),
            Tier::Haiku => Some(Tier::Sonnet),
            Tier::Sonnet => Some(Tier::Opus),
            Tier::Auto | Tier::Cloud | Tier::Opus | Tier::Gpt4o => None,
        }
    }

    /// Cloud model identifier for this tier. `None` for local tiers.
    pub fn model_id(self) -> Option<&'static str> {
        match self {
            Tier::Cache | Tier::Local => None,
            Tier::Auto | Tier::Cloud => Some("openrouter/auto"),
            Tier::Haiku => Some("anthropic/claude-3-haiku"),
            Tier::Sonnet => Some("anthropic/claude-3.5-sonnet"),
            Tier::Opus => Some("anthropic/claude-3-opus"),
            Tier::Gpt4o => Some("openai/gpt-4o"),
        }
    }
}

/// Whether a model identifier denotes a free offering.
pub fn is_free_model(model: &str) -> bool {
    model.ends_with(FREE_MODEL_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn local_tiers_are_free() {
        for tier in [Tier::Cache, Tier::Local] {
            assert!(tier.is_local());
            assert!(!tier.is_paid());
            assert_eq!(tier.cost_cents(1_000_000, 1_000_000), 0.0);
            assert!(tier.model_id().is_none());
        }
    }

    #[test]
    fn cloud_tiers_are_paid() {
        for tier in &Tier::ALL[2..] {
            assert!(tier.is_paid(), "{tier} should be paid");
            assert!(!tier.is_local());
            assert!(tier.model_id().is_some());
        }
    }

    #[test]
    fn auto_cost_for_typical_query() {
        // 500 in, 1000 out: 0.5 * 0.03 + 1.0 * 0.15
        let cost = Tier::Auto.cost_cents(500, 1000);
        assert!((cost - 0.165).abs() < 1e-9, "got {cost}");
    }

    #[test]
    fn opus_is_most_expensive() {
        let opus = Tier::Opus.cost_cents(500, 1000);
        for tier in Tier::ALL {
            assert!(tier.cost_cents(500, 1000) <= opus);
        }
    }

    #[test]
    fn ordering_follows_declaration() {
        assert!(Tier::Cache < Tier::Local);
        assert!(Tier::Local < Tier::Auto);
        assert!(Tier::Opus < Tier::Gpt4o);
        assert_eq!(Tier::Cache.order(), 0);
        assert_eq!(Tier::Gpt4o.order(), 7);
    }

    #[test]
    fn escalation_chain() {
        assert_eq!(Tier::Cache.escalate(), Some(Tier::Local));
        assert_eq!(Tier::Local.escalate(), Some(Tier::Cloud));
        assert_eq!(Tier::Haiku.escalate(), Some(Tier::Sonnet));
        assert_eq!(Tier::Sonnet.escalate(), Some(Tier::Opus));
        assert_eq!(Tier::Opus.escalate(), None);
        assert_eq!(Tier::Gpt4o.escalate(), None);
    }

    #[test]
    fn parse_and_display() {
        assert_eq!(Tier::from_str("GPT-4o").unwrap(), Tier::Gpt4o);
        assert_eq!(Tier::from_str("Sonnet").unwrap(), Tier::Sonnet);
        assert_eq!(Tier::Gpt4o.to_string(), "GPT-4o");
        assert!(Tier::from_str("platinum").is_err());
    }

    #[test]
    fn free_marker() {
        assert!(is_free_model("meta-llama/llama-3.1-8b-instruct:free"));
        assert!(!is_free_model("openrouter/auto"));
    }
}
