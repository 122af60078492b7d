//! Transaction record model: one confirmed wizard run.
//!
//! Maps to the `transactions` table and is used by LedgerRepository.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TransactionRecord {
    pub user_id: i64,
    pub chat_id: i64,
    pub command: String,
    /// `YYYY-MM-DD` as entered.
    pub date: String,
    pub budget_group_id: i64,
    pub budget_group: String,
    pub budget_type_id: i64,
    pub budget_type: String,
    pub description: String,
    /// Decimal string as entered (e.g. `1500`, `12.5`).
    pub amount: String,
    pub created_at: DateTime<Utc>,
}
