pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod ingest;
pub mod models;
pub mod reports;
pub mod state;
pub mod validation;

#[cfg(test)]
pub mod tests;

// Re-export specific items for convenience
pub use api::error::ApiError;
pub use api::response::ApiResponse;
pub use api::route::{create_router, RecentQuery, TransactionsQuery};
pub use db::{StoreError, TransactionStore};
pub use ingest::{normalize, SyncReport, SyncService};
pub use models::{CanonicalTransaction, EntryType, StoredTransaction};
