//! End-to-end sync of scripted pages into an in-memory store

use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::cache::{CacheKey, QueryCache};
use crate::config::Config;
use crate::db::TransactionStore;
use crate::ingest::{
    sync::sync_source, FetchError, FetchWindow, Fetcher, Page, SyncService, TransactionSource,
};
use crate::tests::support::{
    everything, page_of, raw_expense, raw_without_counter, spawn_upstream, ScriptedSource,
};

#[tokio::test]
async fn sync_reports_drops_and_inserts() {
    let store = TransactionStore::in_memory().await.unwrap();
    let fetcher = Fetcher::new(Duration::ZERO, 0);
    let source = ScriptedSource::new(
        3,
        vec![
            Ok(page_of(vec![
                raw_expense(3_000, "Silpo", 412.35, "Groceries"),
                raw_without_counter(2_500),
                raw_expense(2_000, "Uklon", 120.0, "Taxi"),
            ])),
            Ok(page_of(vec![raw_expense(1_000, "Aroma Kava", 65.0, "Coffee")])),
        ],
    );

    let report = sync_source(&fetcher, &source, &store, None, everything()).await.unwrap();

    assert_eq!(report.source, "scripted");
    assert_eq!(report.fetched, 4);
    assert_eq!(report.normalized, 3);
    assert_eq!(report.dropped, 1);
    assert_eq!(report.inserted, 3);
    assert_eq!(store.count().await.unwrap(), 3);
}

#[tokio::test]
async fn resync_inserts_nothing_new() {
    let store = TransactionStore::in_memory().await.unwrap();
    let fetcher = Fetcher::new(Duration::ZERO, 0);
    let page = || {
        Ok(page_of(vec![
            raw_expense(3_000, "Silpo", 412.35, "Groceries"),
            raw_expense(2_000, "Uklon", 120.0, "Taxi"),
        ]))
    };

    let first = ScriptedSource::new(5, vec![page()]);
    let second = ScriptedSource::new(5, vec![page()]);

    assert_eq!(sync_source(&fetcher, &first, &store, None, everything()).await.unwrap().inserted, 2);
    assert_eq!(sync_source(&fetcher, &second, &store, None, everything()).await.unwrap().inserted, 0);
    assert_eq!(store.count().await.unwrap(), 2);
}

#[tokio::test]
async fn records_differing_only_in_category_store_once() {
    let store = TransactionStore::in_memory().await.unwrap();
    let fetcher = Fetcher::new(Duration::ZERO, 0);
    let source = ScriptedSource::new(
        5,
        vec![Ok(page_of(vec![
            raw_expense(3_000, "Silpo", 412.35, "Groceries"),
            raw_expense(3_000, "Silpo", 412.35, "Shopping"),
        ]))],
    );

    let report = sync_source(&fetcher, &source, &store, None, everything()).await.unwrap();

    assert_eq!(report.normalized, 2);
    assert_eq!(report.inserted, 1);
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn storage_failure_aborts_the_sync() {
    let store = TransactionStore::in_memory().await.unwrap();
    store.close().await;
    let fetcher = Fetcher::new(Duration::ZERO, 0);
    let source = ScriptedSource::new(5, vec![Ok(page_of(vec![raw_expense(1, "x", 1.0, "y")]))]);

    assert!(sync_source(&fetcher, &source, &store, None, everything()).await.is_err());
}

#[tokio::test]
async fn inserts_clear_cached_queries() {
    let store = TransactionStore::in_memory().await.unwrap();
    let cache = QueryCache::new(&Config::default());
    let fetcher = Fetcher::new(Duration::ZERO, 0);
    let key = CacheKey::range(None, None);

    let before = cache.get_or_load(key.clone(), store.query(None, None)).await.unwrap();
    assert!(before.is_empty());

    let source = ScriptedSource::new(5, vec![Ok(page_of(vec![raw_expense(1_000, "Silpo", 10.0, "Groceries")]))]);
    sync_source(&fetcher, &source, &store, Some(&cache), everything()).await.unwrap();

    let after = cache.get_or_load(key, store.query(None, None)).await.unwrap();
    assert_eq!(after.len(), 1);
}

/// Replays a scripted source but closes the store before serving its second page.
struct StoreClosingSource {
    inner: ScriptedSource,
    store: TransactionStore,
}

impl TransactionSource for StoreClosingSource {
    type Cursor = u32;

    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn page_size(&self) -> usize {
        self.inner.page_size()
    }

    fn first_cursor(&self, window: &FetchWindow) -> u32 {
        self.inner.first_cursor(window)
    }

    fn next_cursor(&self, cursor: &u32, page: &Page, window: &FetchWindow) -> Option<u32> {
        self.inner.next_cursor(cursor, page, window)
    }

    async fn fetch_page(&self, cursor: &u32, window: &FetchWindow) -> Result<Page, FetchError> {
        if *cursor == 1 {
            self.store.close().await;
        }
        self.inner.fetch_page(cursor, window).await
    }
}

#[tokio::test]
async fn failed_sync_still_clears_cache_for_committed_pages() {
    let store = TransactionStore::in_memory().await.unwrap();
    let cache = QueryCache::new(&Config::default());
    let fetcher = Fetcher::new(Duration::ZERO, 0);
    let key = CacheKey::recent(5);

    cache.get_or_load(key.clone(), store.recent(5)).await.unwrap();

    let source = StoreClosingSource {
        inner: ScriptedSource::new(
            1,
            vec![
                Ok(page_of(vec![raw_expense(2_000, "Silpo", 10.0, "Groceries")])),
                Ok(page_of(vec![raw_expense(1_000, "ATB", 5.0, "Groceries")])),
            ],
        ),
        store: store.clone(),
    };

    let result = sync_source(&fetcher, &source, &store, Some(&cache), everything()).await;
    assert!(result.is_err());

    let reloaded = AtomicBool::new(false);
    cache
        .get_or_load(key, async {
            reloaded.store(true, Ordering::SeqCst);
            Ok(Vec::new())
        })
        .await
        .unwrap();
    assert!(reloaded.load(Ordering::SeqCst));
}

async fn always_rate_limited() -> impl IntoResponse {
    (StatusCode::TOO_MANY_REQUESTS, [("Retry-After", "30")])
}

async fn rate_limited_service() -> SyncService {
    let router = Router::new().route(
        "/personal/statement/{account}/{from}/{to}",
        get(always_rate_limited),
    );
    let base = spawn_upstream(router).await;

    let config = Config {
        monobank_api_url: base,
        monobank_token: Some("token".to_string()),
        request_interval: Duration::ZERO,
        http_timeout_secs: 5,
        ..Config::default()
    };
    let store = TransactionStore::in_memory().await.unwrap();

    SyncService::from_config(&config, store, None).unwrap()
}

fn cancel_after(delay: Duration) -> CancellationToken {
    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        trigger.cancel();
    });
    shutdown
}

#[tokio::test]
async fn shutdown_interrupts_startup_sync_waiting_on_rate_limit() {
    let service = rate_limited_service().await;
    assert!(service.has_sources());
    let shutdown = cancel_after(Duration::from_millis(200));

    let finished = tokio::time::timeout(
        Duration::from_secs(5),
        service.run_periodic(Duration::ZERO, true, shutdown),
    )
    .await;

    assert!(finished.is_ok());
}

#[tokio::test]
async fn shutdown_interrupts_periodic_sync_waiting_on_rate_limit() {
    let service = rate_limited_service().await;
    let shutdown = cancel_after(Duration::from_millis(200));

    let finished = tokio::time::timeout(
        Duration::from_secs(5),
        service.run_periodic(Duration::from_secs(3600), true, shutdown),
    )
    .await;

    assert!(finished.is_ok());
}
