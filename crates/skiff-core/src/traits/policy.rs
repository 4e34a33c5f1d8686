// SPDX-FileCopyrightText: 2026 Skiff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Classification policy contract.

use crate::types::ClassificationLevel;

/// Supplies the classification level for a query.
pub trait ClassificationPolicy: Send + Sync {
    fn classify(&self, query: &str) -> ClassificationLevel;

    /// Unconditional rule: CUI and above never go to the cloud.
    fn blocks_cloud(&self, level: ClassificationLevel) -> bool {
        level.blocks_cloud()
    }
}

/// Policy that assigns one fixed level to every query.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticClassification(pub ClassificationLevel);

impl ClassificationPolicy for StaticClassification {
    fn classify(&self, _query: &str) -> ClassificationLevel {
        self.0
    }
}
