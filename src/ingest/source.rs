use reqwest::{header::RETRY_AFTER, Response, StatusCode};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use crate::ingest::models::RawTransaction;

/// Delay used when a 429 response carries no usable `Retry-After` header.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("Unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid source configuration: {0}")]
    InvalidConfig(String),
}

impl FetchError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, FetchError::RateLimited { .. })
    }
}

/// Inclusive time window, Unix milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl FetchWindow {
    pub fn new(start_ms: i64, end_ms: i64) -> Self {
        Self { start_ms, end_ms }
    }

    /// The last `days` days up to `end_ms`.
    pub fn last_days(end_ms: i64, days: i64) -> Self {
        Self {
            start_ms: end_ms - days * 24 * 60 * 60 * 1000,
            end_ms,
        }
    }

    pub fn contains(&self, ts_ms: i64) -> bool {
        ts_ms >= self.start_ms && ts_ms <= self.end_ms
    }
}

/// One response from a provider.
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// Records that parsed and fall inside the requested window
    pub records: Vec<RawTransaction>,
    /// Items the provider returned, including skipped ones. Exhaustion is
    /// judged on this count.
    pub received: usize,
    /// Oldest timestamp among the parsed items, inside the window or not
    pub oldest_ms: Option<i64>,
}

impl Page {
    /// Build a page from the parsed items, keeping only those inside `window`.
    pub fn within(window: &FetchWindow, received: usize, parsed: Vec<RawTransaction>) -> Self {
        let oldest_ms = parsed.iter().map(|r| r.transaction_date).min();
        let records = parsed
            .into_iter()
            .filter(|r| window.contains(r.transaction_date))
            .collect();

        Self {
            records,
            received,
            oldest_ms,
        }
    }
}

/// A paginated remote transaction list.
pub trait TransactionSource {
    type Cursor: Clone + Send + Sync + std::fmt::Debug;

    fn name(&self) -> &'static str;

    /// Maximum items per response; a shorter page means the list is exhausted.
    fn page_size(&self) -> usize;

    fn first_cursor(&self, window: &FetchWindow) -> Self::Cursor;

    /// Cursor for the request after `page`, or `None` if nothing relevant remains.
    fn next_cursor(&self, cursor: &Self::Cursor, page: &Page, window: &FetchWindow) -> Option<Self::Cursor>;

    fn fetch_page(
        &self,
        cursor: &Self::Cursor,
        window: &FetchWindow,
    ) -> impl Future<Output = Result<Page, FetchError>> + Send;
}

/// Map non-success responses to [`FetchError`], reading `Retry-After` on 429.
pub async fn check_status(response: Response) -> Result<Response, FetchError> {
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_RETRY_AFTER);
        return Err(FetchError::RateLimited { retry_after });
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(FetchError::Status { status, body });
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_bounds_are_inclusive() {
        let window = FetchWindow::new(100, 200);
        assert!(window.contains(100));
        assert!(window.contains(200));
        assert!(!window.contains(99));
        assert!(!window.contains(201));
    }

    #[test]
    fn last_days_spans_whole_days() {
        let window = FetchWindow::last_days(1_706_745_600_000, 31);
        assert_eq!(window.end_ms - window.start_ms, 31 * 86_400_000);
    }

    fn response(status: u16, retry_after: Option<&str>) -> Response {
        let mut builder = axum::http::Response::builder().status(status);
        if let Some(value) = retry_after {
            builder = builder.header(RETRY_AFTER, value);
        }
        Response::from(builder.body("slow down").unwrap())
    }

    async fn retry_after(value: Option<&str>) -> Duration {
        match check_status(response(429, value)).await {
            Err(FetchError::RateLimited { retry_after }) => retry_after,
            other => panic!("expected rate limit, got {:?}", other.map(|r| r.status())),
        }
    }

    #[tokio::test]
    async fn rate_limit_delay_comes_from_header() {
        assert_eq!(retry_after(Some("7")).await, Duration::from_secs(7));
        assert_eq!(retry_after(Some(" 0 ")).await, Duration::ZERO);
    }

    #[tokio::test]
    async fn rate_limit_delay_defaults_when_header_missing_or_unreadable() {
        assert_eq!(retry_after(None).await, DEFAULT_RETRY_AFTER);
        assert_eq!(retry_after(Some("soon")).await, DEFAULT_RETRY_AFTER);
        assert_eq!(
            retry_after(Some("Wed, 21 Oct 2015 07:28:00 GMT")).await,
            DEFAULT_RETRY_AFTER
        );
    }

    #[tokio::test]
    async fn other_failures_keep_status_and_body() {
        match check_status(response(503, None)).await {
            Err(FetchError::Status { status, body }) => {
                assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
                assert_eq!(body, "slow down");
            }
            other => panic!("expected status error, got {:?}", other.map(|r| r.status())),
        }

        assert!(check_status(response(200, None)).await.is_ok());
    }

    #[test]
    fn only_rate_limits_are_retryable() {
        assert!(FetchError::RateLimited { retry_after: Duration::ZERO }.is_rate_limited());
        assert!(!FetchError::InvalidConfig("x".to_string()).is_rate_limited());
    }
}
