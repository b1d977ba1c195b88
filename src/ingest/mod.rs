pub mod fetcher;
pub mod models;
pub mod monobank;
pub mod normalizer;
pub mod saldo;
pub mod source;
pub mod sync;

// Re-exports for convenience
pub use fetcher::Fetcher;
pub use models::RawTransaction;
pub use monobank::MonobankClient;
pub use normalizer::{normalize, try_normalize, NormalizeError};
pub use saldo::SaldoClient;
pub use source::{FetchError, FetchWindow, Page, TransactionSource};
pub use sync::{SyncReport, SyncService};
