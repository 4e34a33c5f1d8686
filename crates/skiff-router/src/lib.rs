// SPDX-FileCopyrightText: 2026 Skiff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tier routing for Skiff.
//!
//! This crate provides:
//! - [`Tier`]: backend cost classes with per-token rates
//! - [`KeywordHeuristic`]: zero-latency complexity classification behind [`ComplexityHeuristic`]
//! - [`Router`]: classification-gated, cost-bounded tier selection
//! - [`ExactCache`]: the in-memory response cache
//! - [`SessionStats`]: per-session cost accounting
//!
//! Routing happens before any network call, so a query that must stay
//! on the machine never reaches a cloud client.

pub mod cache;
pub mod classifier;
pub mod cost;
pub mod router;
pub mod tier;

pub use cache::{normalize_query, ExactCache};
pub use classifier::{ComplexityClass, ComplexityHeuristic, KeywordHeuristic, QueryType};
pub use cost::{calculate_savings_vs_opus, cloud_cost_usd, estimate_tokens, SessionStats};
pub use router::{estimate_cost, Router, RouterOptions, RoutingDecision, MAX_QUERY_BYTES};
pub use tier::{is_free_model, Tier, FREE_MODEL_SUFFIX};
