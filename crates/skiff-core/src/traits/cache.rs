// SPDX-FileCopyrightText: 2026 Skiff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Response cache contract.

use crate::types::CacheStats;

/// Exact or semantic response cache consulted by the router before any backend call.
///
/// Implementations must be safe for concurrent callers working on independent
/// queries. Lookups are read-mostly.
pub trait CacheTier: Send + Sync {
    /// Returns the cached answer for `query`, if any.
    fn lookup(&self, query: &str) -> Option<String>;

    /// Stores an answer for later lookups.
    fn store(&self, query: &str, answer: &str);

    /// Hit and lookup counters.
    fn stats(&self) -> CacheStats;
}
