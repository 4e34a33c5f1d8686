// SPDX-FileCopyrightText: 2026 Skiff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `skiff route`: show where a question would go without sending it.

use std::sync::Arc;

use clap::Args;
use colored::Colorize;
use skiff_config::{RoutingMode, SkiffConfig};
use skiff_core::{
    AuditSink, CacheTier, ClassificationLevel, ClassificationPolicy, SkiffError,
    StaticClassification, TracingAuditSink,
};
use skiff_router::{ExactCache, KeywordHeuristic, Router, RouterOptions, Tier};

use crate::display;

/// Routing overrides shared by `ask` and `route`.
#[derive(Args, Debug, Clone, Default)]
pub struct RoutingFlags {
    /// Never send the question to the cloud.
    #[arg(long, visible_alias = "local")]
    pub paranoid: bool,

    /// No network use beyond the local model server. Implies --paranoid.
    #[arg(long)]
    pub offline: bool,

    /// Routing mode: auto, local, cloud or hybrid.
    #[arg(long, value_name = "MODE")]
    pub mode: Option<RoutingMode>,

    /// Most expensive tier the router may choose.
    #[arg(long, value_name = "TIER")]
    pub max_tier: Option<Tier>,

    /// Data classification of the question (unclassified, cui, confidential, secret, top-secret).
    #[arg(long, value_name = "LEVEL")]
    pub classification: Option<ClassificationLevel>,
}

impl RoutingFlags {
    /// Folds the switches into the loaded configuration.
    pub fn apply(&self, config: &mut SkiffConfig) {
        if self.paranoid {
            config.security.paranoid = true;
        }
        if self.offline {
            config.security.offline = true;
            config.security.paranoid = true;
        }
        if let Some(mode) = self.mode {
            config.routing.mode = mode;
        }
    }

    pub fn router_options(&self, config: &SkiffConfig) -> RouterOptions {
        let mut opts = RouterOptions::from_config(config);
        if let Some(tier) = self.max_tier {
            opts.max_tier = Some(tier);
        }
        opts
    }

    pub fn classification(&self, config: &SkiffConfig, question: &str) -> ClassificationLevel {
        let level = self
            .classification
            .unwrap_or(config.routing.default_classification);
        StaticClassification(level).classify(question)
    }
}

#[derive(Args, Debug)]
pub struct RouteArgs {
    /// The question to route.
    #[arg(required = true, num_args = 1..)]
    pub question: Vec<String>,

    #[command(flatten)]
    pub routing: RoutingFlags,

    /// Print the decision as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Router wired to the configured cache and the default heuristic.
pub fn build_router(config: &SkiffConfig, audit: Arc<dyn AuditSink>) -> Router {
    let cache = config
        .cache
        .enabled
        .then(|| Arc::new(ExactCache::new(config.cache.capacity)) as Arc<dyn CacheTier>);
    Router::new(cache, Box::new(KeywordHeuristic::new()), audit)
}

pub fn run_route(mut config: SkiffConfig, args: RouteArgs) -> Result<(), SkiffError> {
    args.routing.apply(&mut config);
    let question = args.question.join(" ");
    let classification = args.routing.classification(&config, &question);
    let opts = args.routing.router_options(&config);

    let router = build_router(&config, Arc::new(TracingAuditSink));
    let decision = router.route(&question, classification, &opts);

    if args.json {
        let json = serde_json::to_string_pretty(&decision)
            .map_err(|e| SkiffError::Internal(format!("failed to encode decision: {e}")))?;
        println!("{json}");
        return Ok(());
    }

    field("Tier:", display::tier_description(decision.tier));
    field("Complexity:", &decision.complexity.to_string());
    field("Query type:", &decision.query_type.to_string());
    field("Classification:", &classification.to_string());
    if decision.tier.is_local() {
        field("Cost:", &"free (local)".green().to_string());
    } else {
        field("Cost:", &format!("~{:.2} cents", decision.estimated_cost_cents));
    }
    field("Reason:", &decision.reason.dimmed().to_string());
    Ok(())
}

fn field(label: &str, value: &str) {
    println!("{} {value}", format!("{label:<15}").bold());
}
