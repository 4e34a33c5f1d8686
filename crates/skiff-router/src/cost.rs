// SPDX-FileCopyrightText: 2026 Skiff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Token estimation, cost accounting, and per-session statistics.
//!
//! Tier rates are in cents per 1K tokens (see [`Tier`]). Cloud usage reported
//! by a backend is priced in USD per million tokens:
//!
//! Default cloud pricing: input=$3.00/MTok, output=$15.00/MTok.
//! Models whose identifier ends in `:free` cost nothing.

use serde::Serialize;

use crate::tier::{is_free_model, Tier};

/// USD per million prompt tokens for priced cloud models.
pub const CLOUD_INPUT_PER_MTOK: f64 = 3.0;

/// USD per million completion tokens for priced cloud models.
pub const CLOUD_OUTPUT_PER_MTOK: f64 = 15.0;

/// Rough token count: the mean of a word estimate and a 4-chars-per-token estimate.
pub fn estimate_tokens(text: &str) -> u32 {
    let words = text.split_whitespace().count();
    let chars = text.len();
    ((words + chars / 4) / 2) as u32
}

/// Cents saved by serving a request on `tier` instead of Opus.
pub fn calculate_savings_vs_opus(tier: Tier, input_tokens: u32, output_tokens: u32) -> f64 {
    Tier::Opus.cost_cents(input_tokens, output_tokens) - tier.cost_cents(input_tokens, output_tokens)
}

/// Cost in USD of a cloud completion.
pub fn cloud_cost_usd(model: &str, prompt_tokens: u32, completion_tokens: u32) -> f64 {
    if is_free_model(model) {
        return 0.0;
    }
    (prompt_tokens as f64 / 1_000_000.0) * CLOUD_INPUT_PER_MTOK
        + (completion_tokens as f64 / 1_000_000.0) * CLOUD_OUTPUT_PER_MTOK
}

/// Cumulative statistics for one interactive session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionStats {
    pub total_queries: u64,
    pub local_queries: u64,
    pub cache_hits: u64,
    pub cloud_queries: u64,
    pub total_cost_cents: f64,
    /// Savings relative to serving every query on Opus.
    pub total_saved_cents: f64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one served query.
    pub fn record(&mut self, tier: Tier, input_tokens: u32, output_tokens: u32) {
        self.total_queries += 1;
        self.total_cost_cents += tier.cost_cents(input_tokens, output_tokens);
        self.total_saved_cents += calculate_savings_vs_opus(tier, input_tokens, output_tokens);
        self.total_input_tokens += u64::from(input_tokens);
        self.total_output_tokens += u64::from(output_tokens);

        match tier {
            Tier::Cache => self.cache_hits += 1,
            Tier::Local => self.local_queries += 1,
            _ => self.cloud_queries += 1,
        }
    }

    pub fn total_tokens(&self) -> u64 {
        self.total_input_tokens + self.total_output_tokens
    }

    /// Share of the Opus-equivalent cost actually spent, in percent. Lower is better.
    pub fn cost_efficiency_percent(&self) -> f64 {
        let opus_equivalent = self.total_cost_cents + self.total_saved_cents;
        if opus_equivalent == 0.0 {
            return 0.0;
        }
        self.total_cost_cents / opus_equivalent * 100.0
    }

    pub fn summary(&self) -> String {
        if self.total_queries == 0 {
            return "No queries processed yet".to_string();
        }
        let pct = |n: u64| n as f64 / self.total_queries as f64 * 100.0;
        format!(
            "Session Stats: {} queries ({:.0}% cache, {:.0}% local, {:.0}% cloud) | Cost: {:.4} cents | Saved: {:.4} cents vs Opus",
            self.total_queries,
            pct(self.cache_hits),
            pct(self.local_queries),
            pct(self.cloud_queries),
            self.total_cost_cents,
            self.total_saved_cents,
        )
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
