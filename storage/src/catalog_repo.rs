//! Catalog repository: budget groups and types stored in SQLite.
//!
//! Uses SqlitePoolManager; implements [`Catalog`] for the dialogue and exposes
//! `add_group` / `add_type` for seeding.

use async_trait::async_trait;
use tracing::info;

use crate::catalog::Catalog;
use crate::error::StorageError;
use crate::models::CatalogEntry;
use crate::sqlite_pool::SqlitePoolManager;

#[derive(Clone)]
pub struct CatalogRepository {
    pool_manager: SqlitePoolManager,
}

impl CatalogRepository {
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool_manager = SqlitePoolManager::new(database_url).await?;
        let repo = Self { pool_manager };
        repo.init().await?;
        Ok(repo)
    }

    async fn init(&self) -> Result<(), sqlx::Error> {
        info!("Creating catalog tables if not exist");

        let pool = self.pool_manager.pool();

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS budget_groups (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS budget_types (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                group_id INTEGER NOT NULL REFERENCES budget_groups(id),
                name TEXT NOT NULL,
                UNIQUE(group_id, name)
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_budget_types_group_id ON budget_types(group_id)")
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Inserts a group and returns its id. An existing group with the same name keeps its id.
    pub async fn add_group(&self, name: &str) -> Result<i64, StorageError> {
        let pool = self.pool_manager.pool();

        sqlx::query("INSERT OR IGNORE INTO budget_groups (name) VALUES (?)")
            .bind(name)
            .execute(pool)
            .await?;

        let (id,): (i64,) = sqlx::query_as("SELECT id FROM budget_groups WHERE name = ?")
            .bind(name)
            .fetch_one(pool)
            .await?;

        info!(group_id = id, name = %name, "Budget group saved");
        Ok(id)
    }

    /// Inserts a type under `group_id` and returns its id. Fails with NotFound for an unknown group.
    pub async fn add_type(&self, group_id: i64, name: &str) -> Result<i64, StorageError> {
        let pool = self.pool_manager.pool();

        let group: Option<(i64,)> = sqlx::query_as("SELECT id FROM budget_groups WHERE id = ?")
            .bind(group_id)
            .fetch_optional(pool)
            .await?;
        if group.is_none() {
            return Err(StorageError::NotFound(format!("budget group {}", group_id)));
        }

        sqlx::query("INSERT OR IGNORE INTO budget_types (group_id, name) VALUES (?, ?)")
            .bind(group_id)
            .bind(name)
            .execute(pool)
            .await?;

        let (id,): (i64,) =
            sqlx::query_as("SELECT id FROM budget_types WHERE group_id = ? AND name = ?")
                .bind(group_id)
                .bind(name)
                .fetch_one(pool)
                .await?;

        info!(group_id, type_id = id, name = %name, "Budget type saved");
        Ok(id)
    }
}

#[async_trait]
impl Catalog for CatalogRepository {
    async fn list_groups(&self) -> Result<Vec<CatalogEntry>, StorageError> {
        let groups = sqlx::query_as::<_, CatalogEntry>(
            "SELECT id, name AS label FROM budget_groups ORDER BY id",
        )
        .fetch_all(self.pool_manager.pool())
        .await?;
        Ok(groups)
    }

    async fn list_types(&self, group_id: i64) -> Result<Vec<CatalogEntry>, StorageError> {
        let types = sqlx::query_as::<_, CatalogEntry>(
            "SELECT id, name AS label FROM budget_types WHERE group_id = ? ORDER BY id",
        )
        .bind(group_id)
        .fetch_all(self.pool_manager.pool())
        .await?;
        Ok(types)
    }
}
