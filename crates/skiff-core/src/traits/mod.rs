// SPDX-FileCopyrightText: 2026 Skiff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator contracts consumed by the router and the agent loop.
//!
//! Backends extend the [`PluginAdapter`] base trait and use `#[async_trait]`
//! for dynamic dispatch compatibility.

pub mod adapter;
pub mod audit;
pub mod backend;
pub mod cache;
pub mod policy;

pub use adapter::PluginAdapter;
pub use audit::{AuditSink, NullAuditSink, TracingAuditSink};
pub use backend::{ChatBackend, ChunkStream, Dispatch, LocalModels, ModelInfo};
pub use cache::CacheTier;
pub use policy::{ClassificationPolicy, StaticClassification};
