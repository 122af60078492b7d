//! Ledger: receives the confirmed transaction at the end of the wizard.
//!
//! [`LedgerRepository`] stores records in SQLite; callers only see the [`Ledger`] trait.

use async_trait::async_trait;
use tracing::info;

use crate::error::StorageError;
use crate::models::TransactionRecord;
use crate::sqlite_pool::SqlitePoolManager;

#[async_trait]
pub trait Ledger: Send + Sync {
    /// Stores one confirmed transaction and returns its row id.
    async fn record(&self, record: &TransactionRecord) -> Result<i64, StorageError>;
}

#[derive(Clone)]
pub struct LedgerRepository {
    pool_manager: SqlitePoolManager,
}

impl LedgerRepository {
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool_manager = SqlitePoolManager::new(database_url).await?;
        let repo = Self { pool_manager };
        repo.init().await?;
        Ok(repo)
    }

    async fn init(&self) -> Result<(), sqlx::Error> {
        info!("Creating transactions table if not exist");

        let pool = self.pool_manager.pool();

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                chat_id INTEGER NOT NULL,
                command TEXT NOT NULL,
                date TEXT NOT NULL,
                budget_group_id INTEGER NOT NULL,
                budget_group TEXT NOT NULL,
                budget_type_id INTEGER NOT NULL,
                budget_type TEXT NOT NULL,
                description TEXT NOT NULL,
                amount TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_transactions_user_id ON transactions(user_id);
            CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Most recent records for one user, newest first.
    pub async fn recent_by_user(
        &self,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<TransactionRecord>, StorageError> {
        let records = sqlx::query_as::<_, TransactionRecord>(
            r#"
            SELECT user_id, chat_id, command, date, budget_group_id, budget_group,
                   budget_type_id, budget_type, description, amount, created_at
            FROM transactions WHERE user_id = ? ORDER BY id DESC LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool_manager.pool())
        .await?;
        Ok(records)
    }
}

#[async_trait]
impl Ledger for LedgerRepository {
    async fn record(&self, record: &TransactionRecord) -> Result<i64, StorageError> {
        let result = sqlx::query(
            r#"
            INSERT INTO transactions (user_id, chat_id, command, date, budget_group_id, budget_group,
                                      budget_type_id, budget_type, description, amount, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.user_id)
        .bind(record.chat_id)
        .bind(&record.command)
        .bind(&record.date)
        .bind(record.budget_group_id)
        .bind(&record.budget_group)
        .bind(record.budget_type_id)
        .bind(&record.budget_type)
        .bind(&record.description)
        .bind(&record.amount)
        .bind(record.created_at)
        .execute(self.pool_manager.pool())
        .await?;

        let id = result.last_insert_rowid();
        info!(
            transaction_id = id,
            user_id = record.user_id,
            amount = %record.amount,
            "Saved transaction"
        );
        Ok(id)
    }
}
