//! Storage models: catalog entries and transaction records.

mod catalog_entry;
mod transaction_record;

pub use catalog_entry::CatalogEntry;
pub use transaction_record::TransactionRecord;
