use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::ingest::models::{JournalEntry, LedgerAccount, RawTransaction};
use crate::ingest::source::{check_status, FetchError, FetchWindow, Page, TransactionSource};
use crate::models::EntryType;

/// Items per statement response; a full page means older items may remain.
pub const STATEMENT_PAGE_SIZE: usize = 500;

/// Longest range a single statement request may cover.
pub const MAX_STATEMENT_WINDOW_SECS: i64 = 31 * 24 * 60 * 60;

/// A statement item whose numbers cannot be represented in ledger form.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum StatementItemError {
    #[error("amount {0} is out of range")]
    AmountOutOfRange(i64),

    #[error("time {0} is out of range")]
    TimeOutOfRange(i64),
}

/// One item of the Monobank personal statement.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementItem {
    #[serde(default)]
    pub id: Option<String>,
    /// Unix seconds
    pub time: i64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub mcc: Option<u32>,
    /// Minor units (kopiyka); negative is money leaving the account
    pub amount: i64,
    #[serde(default)]
    pub currency_code: Option<u16>,
}

impl StatementItem {
    /// Express the item as a two-leg ledger record on `account_name`.
    ///
    /// Spending (negative amount) becomes a positive CREDIT on the master leg,
    /// income a positive DEBIT, matching the Saldo ledger convention.
    pub fn into_raw(self, account_name: &str) -> Result<RawTransaction, StatementItemError> {
        let minor = self
            .amount
            .checked_abs()
            .ok_or(StatementItemError::AmountOutOfRange(self.amount))?;
        let transaction_date = self
            .time
            .checked_mul(1000)
            .ok_or(StatementItemError::TimeOutOfRange(self.time))?;

        let amount = Decimal::new(minor, 2);
        let spending = self.amount < 0;
        let master_type = if spending { EntryType::Credit } else { EntryType::Debit };

        let category = LedgerAccount {
            name: Some(category_for(self.mcc, spending).to_string()),
            kind: Some(if spending { "EXPENSE" } else { "INCOME" }.to_string()),
            icon: None,
        };

        Ok(RawTransaction {
            transaction_date,
            title: self.description,
            source_description: None,
            journal_list: vec![
                JournalEntry {
                    master: true,
                    entry_type: Some(master_type),
                    amount: Some(amount),
                    account: Some(LedgerAccount::named(account_name)),
                },
                JournalEntry {
                    master: false,
                    entry_type: Some(master_type.opposite()),
                    amount: Some(amount),
                    account: Some(category),
                },
            ],
        })
    }
}

/// Category name for a merchant category code.
pub fn category_for(mcc: Option<u32>, spending: bool) -> &'static str {
    if !spending {
        return "Other income";
    }

    match mcc {
        Some(5411 | 5422 | 5441 | 5451 | 5462 | 5499) => "Groceries",
        Some(5812 | 5813 | 5814) => "Eating out",
        Some(4121) => "Taxi",
        Some(4111 | 4112 | 4131 | 5541 | 5542) => "Transport",
        Some(5912 | 8011 | 8021 | 8062 | 8099) => "Health",
        Some(4814 | 4900) => "Bills",
        Some(7832 | 7922 | 7991 | 7994) => "Entertainment",
        Some(3000..=3350 | 4511 | 4722 | 7011) => "Travel",
        Some(5311 | 5651 | 5691 | 5699 | 5732 | 5945 | 5999) => "Shopping",
        _ => "Uncategorized",
    }
}

/// Statement request bounds, Unix seconds, both inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementCursor {
    pub from: i64,
    pub to: i64,
}

/// Client for the Monobank personal statement endpoint.
pub struct MonobankClient {
    http: reqwest::Client,
    base_url: String,
    account_id: String,
    token: String,
    account_name: String,
}

impl MonobankClient {
    pub fn new(
        base_url: &str,
        account_id: &str,
        token: &str,
        account_name: &str,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        info!("Initializing Monobank client for account {} at {}", account_id, base_url);

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            account_id: account_id.to_string(),
            token: token.to_string(),
            account_name: account_name.to_string(),
        })
    }

    /// `None` unless a token is configured.
    pub fn from_config(config: &Config) -> Result<Option<Self>, FetchError> {
        let Some(token) = &config.monobank_token else {
            return Ok(None);
        };

        Self::new(
            &config.monobank_api_url,
            &config.monobank_account_id,
            token,
            &config.monobank_account_name,
            Duration::from_secs(config.http_timeout_secs),
        )
        .map(Some)
    }
}

impl TransactionSource for MonobankClient {
    type Cursor = StatementCursor;

    fn name(&self) -> &'static str {
        "monobank"
    }

    fn page_size(&self) -> usize {
        STATEMENT_PAGE_SIZE
    }

    fn first_cursor(&self, window: &FetchWindow) -> StatementCursor {
        let to = window.end_ms.div_euclid(1000);
        let requested_from = window.start_ms.div_euclid(1000);
        let earliest = to - MAX_STATEMENT_WINDOW_SECS;

        if requested_from < earliest {
            warn!(
                "Monobank statements cover at most 31 days; clamping start from {} to {}",
                requested_from, earliest
            );
        }

        StatementCursor {
            from: requested_from.max(earliest),
            to,
        }
    }

    fn next_cursor(
        &self,
        cursor: &StatementCursor,
        page: &Page,
        _window: &FetchWindow,
    ) -> Option<StatementCursor> {
        // Items arrive newest first; continue up to the oldest one seen
        let oldest = page.oldest_ms?.div_euclid(1000);
        if oldest >= cursor.to || oldest < cursor.from {
            return None;
        }

        Some(StatementCursor {
            from: cursor.from,
            to: oldest,
        })
    }

    async fn fetch_page(
        &self,
        cursor: &StatementCursor,
        window: &FetchWindow,
    ) -> Result<Page, FetchError> {
        let url = format!(
            "{}/personal/statement/{}/{}/{}",
            self.base_url, self.account_id, cursor.from, cursor.to
        );
        debug!("Requesting Monobank statement {}", url);

        let response = self
            .http
            .get(&url)
            .header("X-Token", &self.token)
            .send()
            .await?;

        let body = check_status(response).await?.bytes().await?;
        let items: Vec<Value> = serde_json::from_slice(&body)?;

        Ok(parse_items(items, &self.account_name, window))
    }
}

fn parse_items(items: Vec<Value>, account_name: &str, window: &FetchWindow) -> Page {
    let received = items.len();

    let parsed = items
        .into_iter()
        .filter_map(|item| {
            let item = match serde_json::from_value::<StatementItem>(item) {
                Ok(item) => item,
                Err(e) => {
                    warn!("Skipping unreadable Monobank statement item: {}", e);
                    return None;
                }
            };

            let id = item.id.clone();
            match item.into_raw(account_name) {
                Ok(raw) => Some(raw),
                Err(e) => {
                    warn!("Skipping Monobank statement item {:?}: {}", id, e);
                    None
                }
            }
        })
        .collect();

    Page::within(window, received, parsed)
}
