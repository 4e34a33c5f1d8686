// SPDX-FileCopyrightText: 2026 Skiff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Terminal rendering for routing decisions and cost summaries.
//!
//! Everything here goes to stderr so stdout carries only the answer.

use colored::Colorize;
use skiff_router::{RoutingDecision, Tier, calculate_savings_vs_opus};

const SEPARATOR_WIDTH: usize = 45;

/// Human description of where a tier is served.
pub fn tier_description(tier: Tier) -> &'static str {
    match tier {
        Tier::Cache => "Cache (instant)",
        Tier::Local => "Local (Ollama)",
        Tier::Auto => "Auto (OpenRouter routing)",
        Tier::Cloud => "Cloud (OpenRouter auto)",
        Tier::Haiku | Tier::Sonnet | Tier::Opus => "Cloud (Claude Haiku/Sonnet/Opus)",
        Tier::Gpt4o => "Cloud (GPT-4o)",
    }
}

/// Groups digits in threes: `1234567` becomes `1,234,567`.
pub fn format_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn estimated_cost(decision: &RoutingDecision) -> String {
    if decision.tier.is_local() {
        "free (local)".to_string()
    } else {
        format!("~{:.2} cents", decision.estimated_cost_cents)
    }
}

/// Routing line and cost estimate shown before an answer.
pub fn print_routing_decision(decision: &RoutingDecision) {
    eprintln!(
        "{} {} -> {}",
        "Routing:".dimmed(),
        decision.complexity,
        tier_description(decision.tier).bold()
    );
    eprintln!(
        "{} {}",
        "Estimated cost:".dimmed(),
        estimated_cost(decision)
    );
    eprintln!();
}

/// Token and cost totals for one served question.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostSummary {
    pub tier: Tier,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub cost_cents: f64,
}

impl CostSummary {
    /// Summary priced at the tier's own rates.
    pub fn at_tier_rates(tier: Tier, input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            tier,
            input_tokens,
            output_tokens,
            cost_cents: tier.cost_cents(input_tokens, output_tokens),
        }
    }

    pub fn total_tokens(&self) -> u64 {
        u64::from(self.input_tokens) + u64::from(self.output_tokens)
    }

    pub fn saved_cents(&self) -> f64 {
        calculate_savings_vs_opus(self.tier, self.input_tokens, self.output_tokens)
    }

    /// The uncoloured summary line.
    pub fn line(&self) -> String {
        let mut line = format!(
            "Tier: {} | Tokens: {} | Cost: {:.3} cents",
            self.tier,
            format_thousands(self.total_tokens()),
            self.cost_cents
        );
        let saved = self.saved_cents();
        if saved > 0.0 {
            line.push_str(&format!(" | Saved: {saved:.2} cents vs Opus"));
        }
        line
    }

    pub fn print(&self) {
        eprintln!();
        eprintln!("{}", "─".repeat(SEPARATOR_WIDTH).dimmed());
        let line = self.line();
        let styled = match self.tier {
            Tier::Cache | Tier::Local => line.green(),
            Tier::Auto => line.purple(),
            _ => line.yellow(),
        };
        eprintln!("{styled}");
    }
}
