// SQLite-backed transaction store with an explicit open/close lifecycle

use sqlx::{
    migrate::MigrateDatabase,
    sqlite::SqlitePoolOptions,
    Sqlite, SqlitePool,
};
use tracing::info;

use crate::db::migration::run_migrations;

/// Handle to the transactions table.
///
/// Cloning is cheap: clones share the same connection pool. Every operation
/// checks a connection out of the pool and returns it on completion or error.
#[derive(Clone, Debug)]
pub struct TransactionStore {
    pool: SqlitePool,
}

impl TransactionStore {
    /// Open (creating if needed) the database at `database_url` and apply the schema.
    pub async fn open(database_url: &str) -> Result<Self, sqlx::Error> {
        // Create database if it doesn't exist
        if !Sqlite::database_exists(database_url).await.unwrap_or(false) {
            info!("Creating database at {}", database_url);
            Sqlite::create_database(database_url).await?;
        }

        let pool = SqlitePool::connect(database_url).await?;

        sqlx::query("PRAGMA journal_mode=WAL").execute(&pool).await?;

        run_migrations(&pool).await?;

        Ok(Self { pool })
    }

    /// A private in-memory database. Pinned to a single connection, since each
    /// SQLite memory connection is its own database.
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        run_migrations(&pool).await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close every connection. Operations after this fail with `PoolClosed`.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Transaction store closed");
    }
}
