// SPDX-FileCopyrightText: 2026 Skiff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Property and scenario tests for tier routing.

use std::sync::Arc;

use proptest::prelude::*;

use skiff_config::RoutingMode;
use skiff_core::{AuditEvent, CacheTier, ClassificationLevel, NullAuditSink};
use skiff_router::{KeywordHeuristic, Router, RouterOptions, Tier};
use skiff_test_utils::{MemoryCache, MockBackend, RecordingAudit};

fn router_with(cache: Option<Arc<dyn CacheTier>>) -> Router {
    Router::new(cache, Box::new(KeywordHeuristic::new()), Arc::new(NullAuditSink))
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn arb_mode() -> impl Strategy<Value = RoutingMode> {
    prop_oneof![
        Just(RoutingMode::Auto),
        Just(RoutingMode::Local),
        Just(RoutingMode::Cloud),
        Just(RoutingMode::Hybrid),
    ]
}

fn arb_tier() -> impl Strategy<Value = Tier> {
    proptest::sample::select(Tier::ALL.to_vec())
}

fn arb_options() -> impl Strategy<Value = RouterOptions> {
    (
        arb_mode(),
        proptest::option::of(arb_tier()),
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
        0.0..5.0f64,
        any::<bool>(),
        proptest::option::of(prop_oneof![
            Just("openrouter/auto".to_string()),
            Just("meta-llama/llama-3.1-8b-instruct:free".to_string()),
        ]),
    )
        .prop_map(
            |(mode, max_tier, paranoid, offline, key, ceiling, prefer_local, cloud_model)| {
                RouterOptions {
                    mode,
                    max_tier,
                    paranoid,
                    offline,
                    has_cloud_key: key,
                    auto_max_cost_cents: ceiling,
                    auto_prefer_local: prefer_local,
                    auto_fallback: true,
                    cloud_model,
                }
            },
        )
}

fn arb_query() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z ?]{0,120}",
        Just("What is 2+2?".to_string()),
        Just("Should I architect this as microservices?".to_string()),
        Just("fix the bug in my parser function".to_string()),
    ]
}

fn arb_blocking_level() -> impl Strategy<Value = ClassificationLevel> {
    prop_oneof![
        Just(ClassificationLevel::Cui),
        Just(ClassificationLevel::Confidential),
        Just(ClassificationLevel::Secret),
        Just(ClassificationLevel::TopSecret),
    ]
}

// ---------------------------------------------------------------------------
// Property: CUI and above never leave the machine
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn classified_queries_stay_local(
        query in arb_query(),
        level in arb_blocking_level(),
        opts in arb_options(),
    ) {
        let decision = router_with(None).route(&query, level, &opts);
        prop_assert!(decision.tier.is_local());
        prop_assert_eq!(decision.estimated_cost_cents, 0.0);
    }
}

// ---------------------------------------------------------------------------
// Property: paranoid or offline means Local at zero cost
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn paranoid_or_offline_is_local_and_free(
        query in arb_query(),
        mut opts in arb_options(),
        offline in any::<bool>(),
    ) {
        if offline { opts.offline = true } else { opts.paranoid = true }
        let cache: Arc<dyn CacheTier> = Arc::new(MemoryCache::with_entry(&query, "cached"));
        let decision = router_with(Some(cache)).route(&query, ClassificationLevel::Unclassified, &opts);
        prop_assert_eq!(decision.tier, Tier::Local);
        prop_assert_eq!(decision.estimated_cost_cents, 0.0);
        prop_assert!(decision.cached_response.is_none());
    }
}

// ---------------------------------------------------------------------------
// Property: free models cost nothing, and the ceiling is respected
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn free_model_is_zero_cost(query in arb_query(), mut opts in arb_options()) {
        opts.cloud_model = Some("mistralai/mistral-7b-instruct:free".to_string());
        let decision = router_with(None).route(&query, ClassificationLevel::Unclassified, &opts);
        if decision.tier.is_local() || decision.tier.is_auto() {
            prop_assert_eq!(decision.estimated_cost_cents, 0.0);
        }
    }

    #[test]
    fn max_tier_is_an_upper_bound(query in arb_query(), opts in arb_options()) {
        let decision = router_with(None).route(&query, ClassificationLevel::Unclassified, &opts);
        if let Some(max) = opts.max_tier {
            prop_assert!(
                decision.tier <= max.max(Tier::Local),
                "max_tier={} but got {}",
                max,
                decision.tier
            );
        }
    }

    #[test]
    fn cost_ceiling_is_respected(query in arb_query(), opts in arb_options()) {
        let decision = router_with(None).route(&query, ClassificationLevel::Unclassified, &opts);
        if opts.auto_max_cost_cents > 0.0 {
            prop_assert!(decision.estimated_cost_cents <= opts.auto_max_cost_cents);
        }
        if !opts.has_cloud_key {
            prop_assert!(!decision.tier.is_paid());
        }
    }

    #[test]
    fn routing_is_deterministic(query in arb_query(), opts in arb_options()) {
        let router = router_with(None);
        let a = router.route(&query, ClassificationLevel::Unclassified, &opts);
        let b = router.route(&query, ClassificationLevel::Unclassified, &opts);
        prop_assert_eq!(a, b);
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn arithmetic_without_key_routes_local() {
    let decision = router_with(None).route(
        "What is 2+2?",
        ClassificationLevel::Unclassified,
        &RouterOptions::default(),
    );
    assert_eq!(decision.tier, Tier::Local);
    assert!(!decision.is_auto_routed);
}

#[test]
fn paranoid_with_key_stays_local() {
    let opts = RouterOptions {
        paranoid: true,
        has_cloud_key: true,
        ..Default::default()
    };
    let decision = router_with(None).route("research X", ClassificationLevel::Unclassified, &opts);
    assert!(decision.tier.is_local());
    assert_eq!(decision.estimated_cost_cents, 0.0);
}

#[test]
fn cache_hit_never_reaches_a_backend() {
    let backend = MockBackend::cloud();
    let cache: Arc<dyn CacheTier> = Arc::new(MemoryCache::with_entry("what is rust", "A language."));
    let opts = RouterOptions {
        has_cloud_key: true,
        ..Default::default()
    };

    let decision = router_with(Some(cache)).route(
        "what is rust",
        ClassificationLevel::Unclassified,
        &opts,
    );
    assert_eq!(decision.tier, Tier::Cache);
    assert_eq!(decision.estimated_cost_cents, 0.0);
    assert_eq!(decision.cached_response.as_deref(), Some("A language."));
    assert_eq!(backend.call_count(), 0);
}

#[test]
fn every_decision_is_audited() {
    let audit = Arc::new(RecordingAudit::new());
    let router = Router::new(None, Box::new(KeywordHeuristic::new()), audit.clone());

    router.route("hello", ClassificationLevel::Secret, &RouterOptions::default());
    router.route("hello", ClassificationLevel::Unclassified, &RouterOptions::default());

    let events = audit.events();
    assert_eq!(events.len(), 2);
    match &events[0] {
        AuditEvent::RoutingDecision {
            tier,
            classification,
            estimated_cost_cents,
            reason,
        } => {
            assert_eq!(tier, "Local");
            assert_eq!(*classification, ClassificationLevel::Secret);
            assert_eq!(*estimated_cost_cents, 0.0);
            assert!(reason.contains("SECRET classification blocks cloud"));
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn remember_feeds_later_lookups() {
    let cache: Arc<dyn CacheTier> = Arc::new(skiff_router::ExactCache::new(16));
    let router = router_with(Some(cache));
    router.remember("Explain  lifetimes", "They bound references.");

    let decision = router.route(
        "explain lifetimes",
        ClassificationLevel::Unclassified,
        &RouterOptions::default(),
    );
    assert_eq!(decision.tier, Tier::Cache);
    assert_eq!(router.cache().map(|c| c.stats().hits), Some(1));
}
