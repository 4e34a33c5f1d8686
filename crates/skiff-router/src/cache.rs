// SPDX-FileCopyrightText: 2026 Skiff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Exact-match in-memory response cache.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use skiff_core::{CacheStats, CacheTier};
use tracing::debug;

/// Responses larger than this are never cached.
pub const MAX_CACHED_RESPONSE_BYTES: usize = 100 * 1024;

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, String>,
    /// Insertion order, oldest first.
    order: VecDeque<String>,
    hits: u64,
    lookups: u64,
}

/// Capacity-bounded cache keyed on the normalized query text.
///
/// When full, the oldest entry is evicted.
#[derive(Debug)]
pub struct ExactCache {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl ExactCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A poisoned cache still holds valid strings; keep serving them.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Trim, lower-case, and collapse runs of whitespace.
pub fn normalize_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

impl CacheTier for ExactCache {
    fn lookup(&self, query: &str) -> Option<String> {
        let key = normalize_query(query);
        let mut inner = self.lock();
        inner.lookups += 1;
        let hit = inner.entries.get(&key).cloned();
        if hit.is_some() {
            inner.hits += 1;
        }
        hit
    }

    fn store(&self, query: &str, answer: &str) {
        if answer.trim().is_empty() || answer.len() > MAX_CACHED_RESPONSE_BYTES {
            debug!(bytes = answer.len(), "response not cacheable");
            return;
        }
        let key = normalize_query(query);
        if key.is_empty() {
            return;
        }

        let mut inner = self.lock();
        if inner
            .entries
            .insert(key.clone(), answer.to_string())
            .is_none()
        {
            inner.order.push_back(key);
        }
        while inner.entries.len() > self.capacity {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            inner.entries.remove(&oldest);
        }
    }

    fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats {
            hits: inner.hits,
            lookups: inner.lookups,
        }
    }
}
