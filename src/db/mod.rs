pub mod connection;
pub mod migration;
pub mod transaction;

pub use connection::TransactionStore;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt row {id}: {reason}")]
    CorruptRow { id: i64, reason: String },
}
