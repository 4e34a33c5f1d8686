// SPDX-FileCopyrightText: 2026 Skiff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Audit collaborator contract.

use tracing::info;

use crate::types::AuditEvent;

/// Receives fire-and-forget audit events.
///
/// `record` cannot fail; sinks that can lose events swallow the error.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// Emits audit events as structured `tracing` events on the `skiff::audit` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) {
        match serde_json::to_string(&event) {
            Ok(json) => info!(target: "skiff::audit", event = %json, "audit"),
            Err(e) => info!(target: "skiff::audit", error = %e, "audit event not serializable"),
        }
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn record(&self, _event: AuditEvent) {}
}
