//! Catalog: read-only source of budget groups and the budget types under each group.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::models::CatalogEntry;

/// Lists the options offered in the budget group / budget type prompts.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// All budget groups, in display order.
    async fn list_groups(&self) -> Result<Vec<CatalogEntry>, StorageError>;
    /// Budget types of one group, in display order. Unknown group yields an empty list.
    async fn list_types(&self, group_id: i64) -> Result<Vec<CatalogEntry>, StorageError>;
}

/// Catalog held in memory; used for tests and for running without a database.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    groups: Vec<CatalogEntry>,
    types: BTreeMap<i64, Vec<CatalogEntry>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a group (builder style).
    pub fn with_group(mut self, id: i64, label: &str) -> Self {
        self.groups.push(CatalogEntry::new(id, label));
        self
    }

    /// Adds a type under `group_id` (builder style).
    pub fn with_type(mut self, group_id: i64, id: i64, label: &str) -> Self {
        self.types
            .entry(group_id)
            .or_default()
            .push(CatalogEntry::new(id, label));
        self
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn list_groups(&self) -> Result<Vec<CatalogEntry>, StorageError> {
        Ok(self.groups.clone())
    }

    async fn list_types(&self, group_id: i64) -> Result<Vec<CatalogEntry>, StorageError> {
        Ok(self.types.get(&group_id).cloned().unwrap_or_default())
    }
}
