use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{sqlite::SqliteRow, Row};
use std::str::FromStr;
use tracing::debug;

use crate::db::{StoreError, TransactionStore};
use crate::models::{CanonicalTransaction, EntryType, StoredTransaction};

const SELECT_COLUMNS: &str = "SELECT id, transaction_date, title, amount, entry_type, account_name,
        category_name, category_type, category_icon, created_at
   FROM transactions";

impl TransactionStore {
    /// Insert transactions, ignoring any whose (date, title, amount, account)
    /// already exists. Returns the number of rows actually inserted.
    pub async fn upsert(&self, transactions: &[CanonicalTransaction]) -> Result<u64, StoreError> {
        if transactions.is_empty() {
            return Ok(0);
        }

        let now = Utc::now().timestamp_millis();

        // Start a transaction for batch insert
        let mut tx = self.pool().begin().await?;
        let mut inserted = 0;

        for transaction in transactions {
            let result = sqlx::query(
                r#"
                INSERT INTO transactions
                (transaction_date, title, amount, entry_type, account_name,
                 category_name, category_type, category_icon, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(transaction_date, title, amount, account_name) DO NOTHING
                "#,
            )
            .bind(transaction.date)
            .bind(&transaction.title)
            .bind(amount_key(&transaction.amount))
            .bind(transaction.entry_type.as_str())
            .bind(&transaction.account_name)
            .bind(&transaction.category_name)
            .bind(transaction.category_type.as_deref())
            .bind(transaction.category_icon.as_deref())
            .bind(now)
            .execute(&mut *tx)
            .await?;

            inserted += result.rows_affected();
        }

        tx.commit().await?;

        debug!(
            "Upserted {} transactions: {} inserted, {} duplicates skipped",
            transactions.len(),
            inserted,
            transactions.len() as u64 - inserted
        );

        Ok(inserted)
    }

    /// Transactions with `start <= date <= end`, newest first. A missing bound is open.
    pub async fn query(
        &self,
        start: Option<i64>,
        end: Option<i64>,
    ) -> Result<Vec<StoredTransaction>, StoreError> {
        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS}
             WHERE (? IS NULL OR transaction_date >= ?)
               AND (? IS NULL OR transaction_date <= ?)
             ORDER BY transaction_date DESC, id DESC"
        ))
        .bind(start)
        .bind(start)
        .bind(end)
        .bind(end)
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(row_to_transaction).collect()
    }

    /// The `limit` most recent transactions, in the same order as [`query`](Self::query).
    pub async fn recent(&self, limit: i64) -> Result<Vec<StoredTransaction>, StoreError> {
        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS}
             ORDER BY transaction_date DESC, id DESC
             LIMIT ?"
        ))
        .bind(limit.max(0))
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(row_to_transaction).collect()
    }

    pub async fn count(&self) -> Result<i64, StoreError> {
        let count = sqlx::query("SELECT COUNT(*) FROM transactions")
            .fetch_one(self.pool())
            .await?
            .get::<i64, _>(0);

        Ok(count)
    }

    /// Remove every stored transaction. Returns the number of rows removed.
    pub async fn clear(&self) -> Result<u64, StoreError> {
        let mut tx = self.pool().begin().await?;
        let result = sqlx::query("DELETE FROM transactions")
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(result.rows_affected())
    }
}

fn amount_key(amount: &Decimal) -> String {
    amount.normalize().to_string()
}

fn row_to_transaction(row: &SqliteRow) -> Result<StoredTransaction, StoreError> {
    let id: i64 = row.try_get("id")?;

    let amount_text: String = row.try_get("amount")?;
    let amount = Decimal::from_str(&amount_text).map_err(|e| StoreError::CorruptRow {
        id,
        reason: format!("invalid amount {:?}: {}", amount_text, e),
    })?;

    let entry_type_text: String = row.try_get("entry_type")?;
    let entry_type = EntryType::from_str(&entry_type_text)
        .map_err(|reason| StoreError::CorruptRow { id, reason })?;

    Ok(StoredTransaction {
        id,
        created_at: row.try_get("created_at")?,
        transaction: CanonicalTransaction {
            date: row.try_get("transaction_date")?,
            title: row.try_get("title")?,
            amount,
            entry_type,
            account_name: row.try_get("account_name")?,
            category_name: row.try_get("category_name")?,
            category_type: row.try_get("category_type")?,
            category_icon: row.try_get("category_icon")?,
        },
    })
}
