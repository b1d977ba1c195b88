//! Shared fixtures for the in-crate test suites

use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use axum::Router;
use futures::stream::{self, StreamExt};
use rust_decimal::Decimal;
use serde_json::json;

use crate::ingest::{FetchError, FetchWindow, Fetcher, Page, RawTransaction, TransactionSource};
use crate::models::{CanonicalTransaction, EntryType};

/// A source that replays canned responses, one per request.
pub struct ScriptedSource {
    page_size: usize,
    responses: Mutex<VecDeque<Result<Page, FetchError>>>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(page_size: usize, responses: Vec<Result<Page, FetchError>>) -> Self {
        Self {
            page_size,
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TransactionSource for ScriptedSource {
    type Cursor = u32;

    fn name(&self) -> &'static str {
        "scripted"
    }

    fn page_size(&self) -> usize {
        self.page_size
    }

    fn first_cursor(&self, _window: &FetchWindow) -> u32 {
        0
    }

    fn next_cursor(&self, cursor: &u32, _page: &Page, _window: &FetchWindow) -> Option<u32> {
        Some(cursor + 1)
    }

    async fn fetch_page(&self, _cursor: &u32, _window: &FetchWindow) -> Result<Page, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Page::default()))
    }
}

/// Drain every page `fetcher` yields into one ordered list.
pub async fn collect_all<S>(fetcher: &Fetcher, source: &S, window: FetchWindow) -> Vec<RawTransaction>
where
    S: TransactionSource + Sync,
{
    fetcher.pages(source, window).flat_map(stream::iter).collect().await
}

pub fn everything() -> FetchWindow {
    FetchWindow::new(i64::MIN, i64::MAX)
}

/// A well-formed two-leg expense record.
pub fn raw_expense(date: i64, title: &str, amount: f64, category: &str) -> RawTransaction {
    serde_json::from_value(json!({
        "transactionDate": date,
        "title": title,
        "journalList": [
            {"master": true, "entryType": "CREDIT", "amount": amount, "account": {"name": "Card"}},
            {"master": false, "entryType": "DEBIT", "amount": amount,
             "account": {"name": category, "type": "EXPENSE"}}
        ]
    }))
    .unwrap()
}

/// A record with no counter leg, which the normalizer drops.
pub fn raw_without_counter(date: i64) -> RawTransaction {
    serde_json::from_value(json!({
        "transactionDate": date,
        "title": "Orphan",
        "journalList": [
            {"master": true, "entryType": "CREDIT", "amount": 1.0, "account": {"name": "Card"}}
        ]
    }))
    .unwrap()
}

pub fn page_of(records: Vec<RawTransaction>) -> Page {
    let received = records.len();
    Page::within(&everything(), received, records)
}

pub fn canonical(date: i64, title: &str, amount: &str, account: &str) -> CanonicalTransaction {
    CanonicalTransaction {
        date,
        title: title.to_string(),
        amount: Decimal::from_str(amount).unwrap(),
        entry_type: EntryType::Credit,
        account_name: account.to_string(),
        category_name: "Groceries".to_string(),
        category_type: Some("EXPENSE".to_string()),
        category_icon: None,
    }
}

/// Serve `router` on an ephemeral local port; returns its base URL.
pub async fn spawn_upstream(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}
