use chrono::Utc;
use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::cache::QueryCache;
use crate::config::Config;
use crate::db::{StoreError, TransactionStore};
use crate::ingest::fetcher::Fetcher;
use crate::ingest::monobank::MonobankClient;
use crate::ingest::normalizer::normalize_batch;
use crate::ingest::saldo::SaldoClient;
use crate::ingest::source::{FetchError, FetchWindow, TransactionSource};

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Source setup failed: {0}")]
    Source(#[from] FetchError),
}

/// Outcome of syncing one source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub source: &'static str,
    pub fetched: usize,
    pub normalized: usize,
    pub dropped: usize,
    pub inserted: u64,
}

/// Fetch, normalize and store every page `source` returns for `window`.
///
/// Each page is upserted as it arrives and `cache` is cleared after any page
/// that inserted rows. A storage error aborts the run; pages stored before it
/// stay stored.
pub async fn sync_source<S>(
    fetcher: &Fetcher,
    source: &S,
    store: &TransactionStore,
    cache: Option<&QueryCache>,
    window: FetchWindow,
) -> Result<SyncReport, StoreError>
where
    S: TransactionSource + Sync,
{
    let mut report = SyncReport {
        source: source.name(),
        ..SyncReport::default()
    };

    let pages = fetcher.pages(source, window);
    futures::pin_mut!(pages);

    while let Some(batch) = pages.next().await {
        let transactions = normalize_batch(&batch);

        report.fetched += batch.len();
        report.normalized += transactions.len();
        report.dropped += batch.len() - transactions.len();

        let inserted = match store.upsert(&transactions).await {
            Ok(inserted) => inserted,
            Err(e) => {
                error!(
                    "Sync of {} aborted after {} inserted: {}",
                    report.source, report.inserted, e
                );
                return Err(e);
            }
        };

        if inserted > 0 {
            if let Some(cache) = cache {
                cache.invalidate_all();
            }
        }
        report.inserted += inserted;
    }

    info!(
        "Synced {}: {} fetched, {} normalized, {} dropped, {} inserted",
        report.source, report.fetched, report.normalized, report.dropped, report.inserted
    );

    Ok(report)
}

/// All configured providers plus the store they feed.
pub struct SyncService {
    saldo: Option<SaldoClient>,
    monobank: Option<MonobankClient>,
    fetcher: Fetcher,
    store: TransactionStore,
    cache: Option<QueryCache>,
    window_days: i64,
}

impl SyncService {
    pub fn from_config(
        config: &Config,
        store: TransactionStore,
        cache: Option<QueryCache>,
    ) -> Result<Self, SyncError> {
        let saldo = SaldoClient::from_config(config)?;
        let monobank = MonobankClient::from_config(config)?;

        if saldo.is_none() && monobank.is_none() {
            info!("No transaction providers configured; sync is a no-op");
        }

        Ok(Self {
            saldo,
            monobank,
            fetcher: Fetcher::from_config(config),
            store,
            cache,
            window_days: config.sync_window_days,
        })
    }

    pub fn has_sources(&self) -> bool {
        self.saldo.is_some() || self.monobank.is_some()
    }

    /// Sync every configured provider over the last `window_days` days.
    pub async fn run_once(&self) -> Result<Vec<SyncReport>, SyncError> {
        let window = FetchWindow::last_days(Utc::now().timestamp_millis(), self.window_days);
        let mut reports = Vec::new();

        let cache = self.cache.as_ref();

        if let Some(saldo) = &self.saldo {
            reports.push(sync_source(&self.fetcher, saldo, &self.store, cache, window).await?);
        }
        if let Some(monobank) = &self.monobank {
            reports.push(sync_source(&self.fetcher, monobank, &self.store, cache, window).await?);
        }

        Ok(reports)
    }

    /// Run [`run_once`](Self::run_once) every `period` until `shutdown` fires.
    ///
    /// A zero period runs at most once and returns. With `immediate` unset the
    /// first run waits one period. Cancelling `shutdown` also abandons a run in
    /// progress, including any rate-limit wait.
    pub async fn run_periodic(&self, period: Duration, immediate: bool, shutdown: CancellationToken) {
        if period.is_zero() {
            if immediate {
                self.log_run(&shutdown).await;
            }
            return;
        }

        info!("Starting periodic sync every {:?}", period);
        let start = if immediate { Instant::now() } else { Instant::now() + period };
        let mut ticker = interval_at(start, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.log_run(&shutdown).await,
                _ = shutdown.cancelled() => {
                    info!("Shutting down periodic sync");
                    break;
                }
            }
        }
    }

    async fn log_run(&self, shutdown: &CancellationToken) {
        tokio::select! {
            result = self.run_once() => {
                if let Err(e) = result {
                    error!("Sync failed: {}", e);
                }
            }
            _ = shutdown.cancelled() => info!("Sync interrupted by shutdown"),
        }
    }
}
