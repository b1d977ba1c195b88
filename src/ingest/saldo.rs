use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::ingest::models::RawTransaction;
use crate::ingest::source::{check_status, FetchError, FetchWindow, Page, TransactionSource};

/// Client for the Saldo budgeting API transaction list.
///
/// The list is paged by page number, newest first, and has no date filter:
/// the window is applied to each page client-side.
pub struct SaldoClient {
    http: reqwest::Client,
    base_url: String,
    account_id: String,
    token: String,
    page_size: usize,
}

#[derive(Debug, Deserialize)]
struct TransactionsResponse {
    #[serde(default)]
    items: Vec<Value>,
}

impl SaldoClient {
    pub fn new(
        base_url: &str,
        account_id: &str,
        token: &str,
        page_size: usize,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        if page_size == 0 {
            return Err(FetchError::InvalidConfig("Saldo page size must be positive".to_string()));
        }

        let http = reqwest::Client::builder().timeout(timeout).build()?;

        info!("Initializing Saldo client for account {} at {}", account_id, base_url);

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            account_id: account_id.to_string(),
            token: token.to_string(),
            page_size,
        })
    }

    /// `None` unless both the account id and token are configured.
    pub fn from_config(config: &Config) -> Result<Option<Self>, FetchError> {
        let (Some(account_id), Some(token)) = (&config.saldo_account_id, &config.saldo_token) else {
            return Ok(None);
        };

        Self::new(
            &config.saldo_api_url,
            account_id,
            token,
            config.saldo_page_size,
            Duration::from_secs(config.http_timeout_secs),
        )
        .map(Some)
    }
}

impl TransactionSource for SaldoClient {
    /// Zero-based page number
    type Cursor = u32;

    fn name(&self) -> &'static str {
        "saldo"
    }

    fn page_size(&self) -> usize {
        self.page_size
    }

    fn first_cursor(&self, _window: &FetchWindow) -> u32 {
        0
    }

    fn next_cursor(&self, cursor: &u32, page: &Page, window: &FetchWindow) -> Option<u32> {
        // Pages are newest first; once a page reaches past the window start, later pages are older still
        match page.oldest_ms {
            Some(oldest) if oldest < window.start_ms => None,
            _ => Some(cursor + 1),
        }
    }

    async fn fetch_page(&self, cursor: &u32, window: &FetchWindow) -> Result<Page, FetchError> {
        let url = format!("{}/{}/transactions", self.base_url, self.account_id);
        debug!("Requesting Saldo page {} from {}", cursor, url);

        let response = self
            .http
            .get(&url)
            .header("Token", &self.token)
            .query(&[
                ("page", cursor.to_string()),
                ("size", self.page_size.to_string()),
                ("sort.by", "DATE".to_string()),
                ("sort.dir", "DESC".to_string()),
            ])
            .send()
            .await?;

        let body = check_status(response).await?.bytes().await?;
        let parsed: TransactionsResponse = serde_json::from_slice(&body)?;

        Ok(parse_items(parsed.items, window))
    }
}

fn parse_items(items: Vec<Value>, window: &FetchWindow) -> Page {
    let received = items.len();

    let parsed = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<RawTransaction>(item) {
            Ok(raw) => Some(raw),
            Err(e) => {
                warn!("Skipping unreadable Saldo transaction: {}", e);
                None
            }
        })
        .collect();

    Page::within(window, received, parsed)
}
