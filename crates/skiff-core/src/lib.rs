// SPDX-FileCopyrightText: 2026 Skiff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for Skiff.
//!
//! This crate provides the error type, conversation types, and the
//! collaborator contracts (backends, cache, classification policy, audit)
//! that the router and agent loop are built against.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::SkiffError;
pub use types::{
    AuditEvent, CacheStats, ChatChunk, ChatRequest, ChatResponse, ClassificationLevel,
    HealthStatus, Message, Role, TokenUsage, ToolCall, ToolDefinition,
};

pub use traits::{
    AuditSink, CacheTier, ChatBackend, ChunkStream, ClassificationPolicy, Dispatch, LocalModels,
    ModelInfo, NullAuditSink, PluginAdapter, StaticClassification, TracingAuditSink,
};
