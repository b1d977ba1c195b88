use sqlx::SqlitePool;
use tracing::info;

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    info!("Running database migrations...");

    // Amounts are stored as normalized decimal text so the natural key compares exactly
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            transaction_date INTEGER NOT NULL,
            title TEXT NOT NULL,
            amount TEXT NOT NULL,
            entry_type TEXT NOT NULL,
            account_name TEXT NOT NULL,
            category_name TEXT NOT NULL,
            category_type TEXT,
            category_icon TEXT,
            created_at INTEGER NOT NULL,
            UNIQUE(transaction_date, title, amount, account_name)
        )"
    )
    .execute(pool)
    .await?;

    // Add indexes for common queries
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_transaction_date
         ON transactions(transaction_date)"
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_category_name
         ON transactions(category_name)"
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_account_name
         ON transactions(account_name)"
    )
    .execute(pool)
    .await?;

    info!("Database migrations completed successfully");
    Ok(())
}
