// SPDX-FileCopyrightText: 2026 Skiff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory cache and audit collaborators.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use skiff_core::{AuditEvent, AuditSink, CacheStats, CacheTier};

/// Cache keyed on the verbatim query, without normalization or eviction.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, String>>,
    stats: Mutex<CacheStats>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seeded with one entry.
    pub fn with_entry(query: &str, answer: &str) -> Self {
        let cache = Self::new();
        cache.store(query, answer);
        cache
    }
}

impl CacheTier for MemoryCache {
    fn lookup(&self, query: &str) -> Option<String> {
        let hit = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(query)
            .cloned();
        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        stats.lookups += 1;
        if hit.is_some() {
            stats.hits += 1;
        }
        hit
    }

    fn store(&self, query: &str, answer: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(query.to_string(), answer.to_string());
    }

    fn stats(&self) -> CacheStats {
        *self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Audit sink that keeps every event.
#[derive(Debug, Default)]
pub struct RecordingAudit {
    events: Mutex<Vec<AuditEvent>>,
}

impl RecordingAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Tool execution events only, as `(tool, success)`.
    pub fn tool_executions(&self) -> Vec<(String, bool)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                AuditEvent::ToolExecution { tool, success, .. } => Some((tool, success)),
                _ => None,
            })
            .collect()
    }
}

impl AuditSink for RecordingAudit {
    fn record(&self, event: AuditEvent) {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).push(event);
    }
}
