// Lazy pagination over a TransactionSource

use backon::{ConstantBuilder, Retryable};
use futures::stream::{self, Stream};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::ingest::models::RawTransaction;
use crate::ingest::source::{FetchError, FetchWindow, Page, TransactionSource, DEFAULT_RETRY_AFTER};

pub struct Fetcher {
    limiter: Option<DefaultDirectRateLimiter>,
    max_rate_limit_retries: u32,
}

impl Fetcher {
    /// `request_interval` paces consecutive requests; zero disables pacing.
    pub fn new(request_interval: Duration, max_rate_limit_retries: u32) -> Self {
        let limiter = Quota::with_period(request_interval).map(RateLimiter::direct);

        Self {
            limiter,
            max_rate_limit_retries,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.request_interval, config.max_rate_limit_retries)
    }

    /// Stream of record batches for `window`, one per provider page.
    ///
    /// Ends after a page shorter than the source's page size, after an empty
    /// page, or at the first non-rate-limit error. Batches yielded before an
    /// error stand as the partial result.
    pub fn pages<'a, S>(
        &'a self,
        source: &'a S,
        window: FetchWindow,
    ) -> impl Stream<Item = Vec<RawTransaction>> + 'a
    where
        S: TransactionSource + Sync,
    {
        let first = source.first_cursor(&window);

        stream::unfold(Some(first), move |cursor| async move {
            let cursor = cursor?;

            let page = match self.fetch_with_backoff(source, &cursor, &window).await {
                Ok(page) => page,
                Err(e) => {
                    error!(
                        "Stopping {} fetch at {:?} after transport failure: {}",
                        source.name(),
                        cursor,
                        e
                    );
                    return None;
                }
            };

            debug!(
                "{} page {:?}: {} items received, {} kept",
                source.name(),
                cursor,
                page.received,
                page.records.len()
            );

            if page.received == 0 {
                return None;
            }

            let next = if page.received < source.page_size() {
                None
            } else {
                source.next_cursor(&cursor, &page, &window)
            };

            Some((page.records, next))
        })
    }

    async fn fetch_with_backoff<S>(
        &self,
        source: &S,
        cursor: &S::Cursor,
        window: &FetchWindow,
    ) -> Result<Page, FetchError>
    where
        S: TransactionSource + Sync,
    {
        let limiter = self.limiter.as_ref();
        let fetch = move || async move {
            if let Some(limiter) = limiter {
                limiter.until_ready().await;
            }
            source.fetch_page(cursor, window).await
        };

        // The provider's Retry-After replaces the builder's delay; the builder only caps attempts
        fetch
            .retry(
                ConstantBuilder::default()
                    .with_delay(DEFAULT_RETRY_AFTER)
                    .with_max_times(self.max_rate_limit_retries as usize),
            )
            .when(FetchError::is_rate_limited)
            .adjust(|e: &FetchError, delay: Option<Duration>| match e {
                FetchError::RateLimited { retry_after } => delay.map(|_| *retry_after),
                _ => delay,
            })
            .notify(|e: &FetchError, delay: Duration| {
                warn!("{} rate limited, waiting {:?}: {}", source.name(), delay, e);
            })
            .await
    }
}
