//! Catalog entry model: one budget group or budget type.
//!
//! Maps to `budget_groups` / `budget_types` rows (`name` selected as `label`).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CatalogEntry {
    pub id: i64,
    pub label: String,
}

impl CatalogEntry {
    pub fn new(id: i64, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
        }
    }
}
