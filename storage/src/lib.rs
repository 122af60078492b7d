//! Storage crate: catalog and ledger persistence.
//!
//! ## Modules
//!
//! - [`error`] – Storage error types
//! - [`models`] – CatalogEntry, TransactionRecord
//! - [`catalog`] – Catalog trait, InMemoryCatalog
//! - [`catalog_repo`] – CatalogRepository (SQLite)
//! - [`ledger`] – Ledger trait, LedgerRepository (SQLite)
//! - [`sqlite_pool`] – SqlitePoolManager

mod catalog;
mod catalog_repo;
mod error;
mod ledger;
mod models;
mod sqlite_pool;

pub use catalog::{Catalog, InMemoryCatalog};
pub use catalog_repo::CatalogRepository;
pub use error::StorageError;
pub use ledger::{Ledger, LedgerRepository};
pub use models::{CatalogEntry, TransactionRecord};
pub use sqlite_pool::SqlitePoolManager;
