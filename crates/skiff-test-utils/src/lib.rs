// SPDX-FileCopyrightText: 2026 Skiff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Skiff integration tests.
//!
//! Provides scripted collaborators for fast, deterministic, CI-runnable
//! tests without a model server or network.
//!
//! # Components
//!
//! - [`MockBackend`] - Scripted chat backend in either dispatch shape, with call counting
//! - [`MemoryCache`] - Verbatim in-memory `CacheTier`
//! - [`RecordingAudit`] - `AuditSink` that keeps every event for assertions

pub mod mock_backend;
pub mod recording;

pub use mock_backend::{MockBackend, MockReply};
pub use recording::{MemoryCache, RecordingAudit};
