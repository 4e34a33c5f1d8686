// SPDX-FileCopyrightText: 2026 Skiff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Policy-gated tier selection.
//!
//! Order of precedence: classification gate > paranoid/offline > input
//! rejection > cache > mode and complexity > cost ceiling. The router never
//! fails; anything ambiguous lands on the local tier.

use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use skiff_config::{RoutingMode, SkiffConfig};
use skiff_core::{AuditEvent, AuditSink, CacheTier, ClassificationLevel};
use tracing::debug;

use crate::classifier::{ComplexityClass, ComplexityHeuristic, QueryType};
use crate::tier::{is_free_model, Tier};

/// Queries longer than this are rejected to the local tier.
pub const MAX_QUERY_BYTES: usize = 100_000;

/// A-priori token estimate used for routing cost.
const ESTIMATE_INPUT_TOKENS: u32 = 500;
const ESTIMATE_OUTPUT_TOKENS: u32 = 1000;

/// Per-call routing configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouterOptions {
    pub mode: RoutingMode,
    pub max_tier: Option<Tier>,
    pub paranoid: bool,
    pub offline: bool,
    pub has_cloud_key: bool,
    /// Cost ceiling per query in cents. Zero means unlimited.
    pub auto_max_cost_cents: f64,
    pub auto_prefer_local: bool,
    pub auto_fallback: bool,
    pub cloud_model: Option<String>,
}

impl RouterOptions {
    /// Options derived from the loaded configuration.
    ///
    /// An unparseable `max_tier` is ignored; config validation reports it.
    pub fn from_config(config: &SkiffConfig) -> Self {
        Self {
            mode: config.routing.mode,
            max_tier: config
                .routing
                .max_tier
                .as_deref()
                .and_then(|t| Tier::from_str(t).ok()),
            paranoid: config.security.paranoid,
            offline: config.security.offline,
            has_cloud_key: config.cloud_api_key().is_some(),
            auto_max_cost_cents: config.routing.auto_max_cost,
            auto_prefer_local: config.routing.auto_prefer_local,
            auto_fallback: config.routing.auto_fallback,
            cloud_model: Some(config.cloud.model.clone()),
        }
    }

    pub fn should_use_local(&self) -> bool {
        self.paranoid
            || self.offline
            || self.mode == RoutingMode::Local
            || (self.mode == RoutingMode::Cloud && !self.has_cloud_key)
    }

    pub fn is_auto_mode(&self) -> bool {
        matches!(self.mode, RoutingMode::Auto | RoutingMode::Hybrid)
    }

    pub fn should_use_openrouter_auto(&self) -> bool {
        self.is_auto_mode() && self.has_cloud_key && !self.paranoid && !self.offline
    }
}

/// The router's verdict for one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutingDecision {
    pub tier: Tier,
    pub complexity: ComplexityClass,
    pub query_type: QueryType,
    /// The cloud auto-router picks the concrete model.
    pub is_auto_routed: bool,
    pub estimated_cost_cents: f64,
    pub reason: String,
    /// Present only for `Tier::Cache`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_response: Option<String>,
}

/// Chooses a tier for each query. Holds no per-query state.
pub struct Router {
    cache: Option<Arc<dyn CacheTier>>,
    heuristic: Box<dyn ComplexityHeuristic>,
    audit: Arc<dyn AuditSink>,
}

impl Router {
    pub fn new(
        cache: Option<Arc<dyn CacheTier>>,
        heuristic: Box<dyn ComplexityHeuristic>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            cache,
            heuristic,
            audit,
        }
    }

    pub fn cache(&self) -> Option<&Arc<dyn CacheTier>> {
        self.cache.as_ref()
    }

    /// Remember an answer for later cache hits. No-op without a cache.
    pub fn remember(&self, query: &str, answer: &str) {
        if let Some(cache) = &self.cache {
            cache.store(query, answer);
        }
    }

    /// Route a query.
    pub fn route(
        &self,
        query: &str,
        classification: ClassificationLevel,
        opts: &RouterOptions,
    ) -> RoutingDecision {
        let decision = self.decide(query, classification, opts);

        debug!(
            tier = %decision.tier,
            complexity = %decision.complexity,
            query_type = %decision.query_type,
            auto = decision.is_auto_routed,
            cost_cents = decision.estimated_cost_cents,
            reason = decision.reason.as_str(),
            "routing decision"
        );
        self.audit.record(AuditEvent::RoutingDecision {
            tier: decision.tier.to_string(),
            classification,
            estimated_cost_cents: decision.estimated_cost_cents,
            reason: decision.reason.clone(),
        });

        decision
    }

    fn decide(
        &self,
        query: &str,
        classification: ClassificationLevel,
        opts: &RouterOptions,
    ) -> RoutingDecision {
        let complexity = self.heuristic.classify_complexity(query);
        let query_type = self.heuristic.classify_type(query);
        let base = |tier: Tier, suffix: &str| {
            format!(
                "Query classified as {complexity} complexity ({query_type} type) -> {tier} tier {suffix}"
            )
        };
        let local = |reason: String| RoutingDecision {
            tier: Tier::Local,
            complexity,
            query_type,
            is_auto_routed: false,
            estimated_cost_cents: 0.0,
            reason,
            cached_response: None,
        };

        if classification.blocks_cloud() {
            return local(base(
                Tier::Local,
                &format!("(FORCED: {classification} classification blocks cloud)"),
            ));
        }
        if opts.paranoid {
            return local(base(Tier::Local, "(FORCED: paranoid mode blocks cloud)"));
        }
        if opts.offline {
            return local(base(Tier::Local, "(FORCED: offline mode blocks cloud)"));
        }

        if let Some(why) = reject_reason(query) {
            return RoutingDecision {
                complexity: ComplexityClass::Simple,
                query_type: QueryType::Unknown,
                ..local(format!("Query rejected: {why}"))
            };
        }

        if let Some(answer) = self.cache.as_ref().and_then(|c| c.lookup(query)) {
            return RoutingDecision {
                tier: Tier::Cache,
                complexity,
                query_type,
                is_auto_routed: false,
                estimated_cost_cents: 0.0,
                reason: base(Tier::Cache, "(cache hit)"),
                cached_response: Some(answer),
            };
        }

        let (mut tier, mut suffix) = select_tier(complexity, opts);

        let ceiling = opts.auto_max_cost_cents;
        if ceiling > 0.0 && estimate_cost(tier, opts) > ceiling {
            let capped = step_down(tier, ceiling, opts);
            debug!(from = %tier, to = %capped, ceiling, "cost ceiling applied");
            tier = capped;
            suffix = format!("(cost ceiling {ceiling:.2}c)");
        }

        RoutingDecision {
            tier,
            complexity,
            query_type,
            is_auto_routed: tier == Tier::Auto,
            estimated_cost_cents: estimate_cost(tier, opts),
            reason: base(tier, &suffix).trim_end().to_string(),
            cached_response: None,
        }
    }
}

fn reject_reason(query: &str) -> Option<String> {
    if query.trim().is_empty() {
        Some("query is empty".to_string())
    } else if query.len() > MAX_QUERY_BYTES {
        Some(format!(
            "query is {} bytes, limit is {MAX_QUERY_BYTES}",
            query.len()
        ))
    } else {
        None
    }
}

/// Tier by mode, credential, and complexity. Cache is already ruled out.
fn select_tier(complexity: ComplexityClass, opts: &RouterOptions) -> (Tier, String) {
    if opts.should_use_local() {
        let suffix = if opts.mode == RoutingMode::Local {
            "(local mode)"
        } else {
            "(no cloud key)"
        };
        return (Tier::Local, suffix.to_string());
    }

    if opts.should_use_openrouter_auto() {
        if opts.auto_prefer_local && complexity <= ComplexityClass::Simple {
            return (Tier::Local, "(prefer local)".to_string());
        }
        if let Some(max) = opts.max_tier
            && max < Tier::Auto
        {
            return (Tier::Local, format!("(capped at {max})"));
        }
        return (Tier::Auto, "(auto-routed)".to_string());
    }

    let mut tier = match complexity.min_tier() {
        Tier::Cache => Tier::Local,
        other => other,
    };
    let mut suffix = String::new();
    if let Some(max) = opts.max_tier
        && tier > max
    {
        tier = if max.is_local() { Tier::Local } else { max };
        suffix = format!("(capped at {max})");
    }
    if tier.is_paid() && !opts.has_cloud_key {
        return (Tier::Local, "(no cloud key)".to_string());
    }
    (tier, suffix)
}

/// Most expensive paid tier cheaper than `from` that fits under `ceiling`
/// and `max_tier`, else Local.
fn step_down(from: Tier, ceiling: f64, opts: &RouterOptions) -> Tier {
    let current = estimate_cost(from, opts);
    Tier::ALL
        .into_iter()
        .filter(|t| t.is_paid() && *t != from)
        .filter(|t| opts.max_tier.is_none_or(|max| *t <= max))
        .map(|t| (t, estimate_cost(t, opts)))
        .filter(|(_, cost)| *cost < current && *cost <= ceiling)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(t, _)| t)
        .unwrap_or(Tier::Local)
}

/// A-priori cost of one query on `tier`, in cents.
pub fn estimate_cost(tier: Tier, opts: &RouterOptions) -> f64 {
    if tier.is_local() {
        return 0.0;
    }
    // Named tiers are pinned to their own model; only the auto-router uses the configured one.
    let model = if tier.is_auto() {
        opts.cloud_model.as_deref().or(tier.model_id())
    } else {
        tier.model_id()
    };
    if model.is_some_and(is_free_model) {
        return 0.0;
    }
    tier.cost_cents(ESTIMATE_INPUT_TOKENS, ESTIMATE_OUTPUT_TOKENS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ExactCache;
    use crate::classifier::KeywordHeuristic;
    use skiff_core::NullAuditSink;

    fn router() -> Router {
        Router::new(
            None,
            Box::new(KeywordHeuristic::new()),
            Arc::new(NullAuditSink),
        )
    }

    fn cloud_opts() -> RouterOptions {
        RouterOptions {
            mode: RoutingMode::Cloud,
            has_cloud_key: true,
            ..Default::default()
        }
    }

    #[test]
    fn predicates() {
        let mut opts = RouterOptions::default();
        assert!(opts.is_auto_mode());
        assert!(!opts.should_use_local());
        assert!(!opts.should_use_openrouter_auto());

        opts.has_cloud_key = true;
        assert!(opts.should_use_openrouter_auto());

        opts.offline = true;
        assert!(opts.should_use_local());
        assert!(!opts.should_use_openrouter_auto());

        let cloud_no_key = RouterOptions {
            mode: RoutingMode::Cloud,
            ..Default::default()
        };
        assert!(cloud_no_key.should_use_local());

        let hybrid = RouterOptions {
            mode: RoutingMode::Hybrid,
            ..Default::default()
        };
        assert!(hybrid.is_auto_mode());
    }

    #[test]
    fn no_key_routes_local() {
        let d = router().route(
            "What is 2+2?",
            ClassificationLevel::Unclassified,
            &RouterOptions::default(),
        );
        assert_eq!(d.tier, Tier::Local);
        assert_eq!(d.estimated_cost_cents, 0.0);
    }

    #[test]
    fn cui_is_forced_local_with_reason() {
        let opts = RouterOptions {
            has_cloud_key: true,
            ..Default::default()
        };
        let d = router().route("architect a system", ClassificationLevel::Cui, &opts);
        assert_eq!(d.tier, Tier::Local);
        assert!(
            d.reason
                .ends_with("(FORCED: CUI classification blocks cloud)"),
            "{}",
            d.reason
        );
        assert!(d.reason.starts_with("Query classified as Expert complexity"));
    }

    #[test]
    fn paranoid_and_offline_reasons() {
        let mut opts = cloud_opts();
        opts.paranoid = true;
        let d = router().route("research X", ClassificationLevel::Unclassified, &opts);
        assert_eq!(d.tier, Tier::Local);
        assert!(d.reason.contains("paranoid mode blocks cloud"));

        opts.paranoid = false;
        opts.offline = true;
        let d = router().route("research X", ClassificationLevel::Unclassified, &opts);
        assert!(d.reason.contains("offline mode blocks cloud"));
    }

    #[test]
    fn paranoid_skips_cache() {
        let cache = Arc::new(ExactCache::new(8));
        cache.store("hello", "cached");
        let router = Router::new(
            Some(cache.clone()),
            Box::new(KeywordHeuristic::new()),
            Arc::new(NullAuditSink),
        );
        let opts = RouterOptions {
            paranoid: true,
            ..Default::default()
        };
        let d = router.route("hello", ClassificationLevel::Unclassified, &opts);
        assert_eq!(d.tier, Tier::Local);
        assert_eq!(cache.stats().lookups, 0);
    }

    #[test]
    fn empty_and_oversized_queries_are_rejected() {
        let d = router().route("   ", ClassificationLevel::Unclassified, &cloud_opts());
        assert_eq!(d.tier, Tier::Local);
        assert_eq!(d.query_type, QueryType::Unknown);
        assert!(d.reason.starts_with("Query rejected:"));

        let big = "a ".repeat(MAX_QUERY_BYTES);
        let d = router().route(&big, ClassificationLevel::Unclassified, &cloud_opts());
        assert_eq!(d.tier, Tier::Local);
        assert_eq!(d.complexity, ComplexityClass::Simple);
    }

    #[test]
    fn auto_mode_with_key_is_auto_routed() {
        let opts = RouterOptions {
            has_cloud_key: true,
            ..Default::default()
        };
        let d = router().route(
            "explain the borrow checker",
            ClassificationLevel::Unclassified,
            &opts,
        );
        assert_eq!(d.tier, Tier::Auto);
        assert!(d.is_auto_routed);
        assert!(d.estimated_cost_cents > 0.0);
    }

    #[test]
    fn prefer_local_keeps_simple_queries_local() {
        let opts = RouterOptions {
            has_cloud_key: true,
            auto_prefer_local: true,
            ..Default::default()
        };
        let d = router().route("what is rust", ClassificationLevel::Unclassified, &opts);
        assert_eq!(d.tier, Tier::Local);
        assert!(d.reason.ends_with("(prefer local)"));
    }

    #[test]
    fn cloud_mode_uses_complexity() {
        let d = router().route("hi", ClassificationLevel::Unclassified, &cloud_opts());
        assert_eq!(d.tier, Tier::Local);

        let d = router().route("fix the bug", ClassificationLevel::Unclassified, &cloud_opts());
        assert_eq!(d.tier, Tier::Cloud);
        assert!(!d.is_auto_routed);
    }

    #[test]
    fn local_mode_reason() {
        let opts = RouterOptions {
            mode: RoutingMode::Local,
            has_cloud_key: true,
            ..Default::default()
        };
        let d = router().route("fix the bug", ClassificationLevel::Unclassified, &opts);
        assert_eq!(d.tier, Tier::Local);
        assert!(d.reason.ends_with("(local mode)"));
    }

    #[test]
    fn max_tier_caps_selection() {
        let mut opts = cloud_opts();
        opts.max_tier = Some(Tier::Local);
        let d = router().route("fix the bug", ClassificationLevel::Unclassified, &opts);
        assert_eq!(d.tier, Tier::Local);
        assert!(d.reason.contains("capped at Local"));
    }

    #[test]
    fn cost_ceiling_steps_down() {
        let mut opts = cloud_opts();
        opts.auto_max_cost_cents = 0.15;
        let d = router().route("fix the bug", ClassificationLevel::Unclassified, &opts);
        assert_eq!(d.tier, Tier::Haiku);
        assert!(d.estimated_cost_cents <= 0.15);

        opts.auto_max_cost_cents = 0.01;
        let d = router().route("fix the bug", ClassificationLevel::Unclassified, &opts);
        assert_eq!(d.tier, Tier::Local);
        assert_eq!(d.estimated_cost_cents, 0.0);
    }

    #[test]
    fn free_cloud_model_costs_nothing() {
        let mut opts = cloud_opts();
        opts.cloud_model = Some("meta-llama/llama-3.1-8b-instruct:free".to_string());
        let d = router().route("fix the bug", ClassificationLevel::Unclassified, &opts);
        assert_eq!(d.tier, Tier::Cloud);
        assert_eq!(d.estimated_cost_cents, 0.0);
    }

    #[test]
    fn max_tier_caps_auto_routing() {
        let opts = RouterOptions {
            has_cloud_key: true,
            max_tier: Some(Tier::Local),
            ..Default::default()
        };
        let d = router().route(
            "explain the borrow checker",
            ClassificationLevel::Unclassified,
            &opts,
        );
        assert_eq!(d.tier, Tier::Local);
        assert!(!d.is_auto_routed);
        assert_eq!(d.estimated_cost_cents, 0.0);
        assert!(d.reason.contains("capped at Local"));

        let opts = RouterOptions {
            max_tier: Some(Tier::Auto),
            ..opts
        };
        let d = router().route(
            "explain the borrow checker",
            ClassificationLevel::Unclassified,
            &opts,
        );
        assert_eq!(d.tier, Tier::Auto);
    }

    #[test]
    fn free_cloud_model_does_not_discount_named_tiers() {
        let opts = RouterOptions {
            cloud_model: Some("meta-llama/llama-3.1-8b-instruct:free".to_string()),
            ..cloud_opts()
        };
        assert_eq!(estimate_cost(Tier::Cloud, &opts), 0.0);
        assert_eq!(estimate_cost(Tier::Auto, &opts), 0.0);
        assert!(estimate_cost(Tier::Haiku, &opts) > 0.0);
        assert_eq!(
            estimate_cost(Tier::Opus, &opts),
            estimate_cost(Tier::Opus, &cloud_opts())
        );
    }

    #[test]
    fn from_config_reads_routing_and_security() {
        let mut config = SkiffConfig::default();
        config.routing.max_tier = Some("Sonnet".to_string());
        config.routing.auto_max_cost = 2.5;
        config.security.offline = true;
        config.cloud.api_key = Some("sk-or-test".to_string());

        let opts = RouterOptions::from_config(&config);
        assert_eq!(opts.max_tier, Some(Tier::Sonnet));
        assert!(opts.offline);
        assert!(opts.has_cloud_key);
        assert!((opts.auto_max_cost_cents - 2.5).abs() < f64::EPSILON);
        assert_eq!(opts.cloud_model.as_deref(), Some("openrouter/auto"));
    }
}
