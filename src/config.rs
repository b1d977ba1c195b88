// Service configuration:
// - database and HTTP server settings
// - query cache settings
// - provider endpoints and credentials (Saldo, Monobank)
// - sync window, interval and request pacing

use chrono::FixedOffset;
use dotenv::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub static_dir: String,
    /// Calendar used for date filters; `None` means the server's local zone
    pub utc_offset: Option<FixedOffset>,
    pub recent_limit: i64,
    pub cache_ttl: Duration,
    pub cache_max_capacity: u64,
    pub saldo_api_url: String,
    pub saldo_account_id: Option<String>,
    pub saldo_token: Option<String>,
    pub saldo_page_size: usize,
    pub monobank_api_url: String,
    pub monobank_account_id: String,
    pub monobank_token: Option<String>,
    pub monobank_account_name: String,
    pub sync_window_days: i64,
    pub sync_interval: Duration,
    pub sync_on_startup: bool,
    pub request_interval: Duration,
    pub http_timeout_secs: u64,
    pub max_rate_limit_retries: u32,
    pub clear_before_sync: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite:transactions.db".to_string(),
            server_host: "127.0.0.1".to_string(),
            server_port: 5001,
            static_dir: "static".to_string(),
            utc_offset: None,
            recent_limit: 5,
            cache_ttl: Duration::from_secs(60),
            cache_max_capacity: 1000,
            saldo_api_url: "https://api.saldoapps.com/v6".to_string(),
            saldo_account_id: None,
            saldo_token: None,
            saldo_page_size: 50,
            monobank_api_url: "https://api.monobank.ua".to_string(),
            monobank_account_id: "0".to_string(),
            monobank_token: None,
            monobank_account_name: "Monobank".to_string(),
            sync_window_days: 31,
            sync_interval: Duration::ZERO,
            sync_on_startup: true,
            request_interval: Duration::from_millis(1000),
            http_timeout_secs: 30,
            max_rate_limit_retries: 5,
            clear_before_sync: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let defaults = Self::default();

        Self {
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            server_host: env::var("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: parsed("SERVER_PORT", defaults.server_port),
            static_dir: env::var("STATIC_DIR").unwrap_or(defaults.static_dir),
            utc_offset: non_empty("UTC_OFFSET").and_then(|v| v.trim().parse().ok()),
            recent_limit: parsed("RECENT_LIMIT", defaults.recent_limit),
            cache_ttl: Duration::from_secs(parsed("CACHE_TTL", defaults.cache_ttl.as_secs())),
            cache_max_capacity: parsed("CACHE_MAX_CAPACITY", defaults.cache_max_capacity),
            saldo_api_url: env::var("SALDO_API_URL").unwrap_or(defaults.saldo_api_url),
            saldo_account_id: non_empty("SALDO_ACCOUNT_ID"),
            saldo_token: non_empty("SALDO_TOKEN"),
            saldo_page_size: parsed("SALDO_PAGE_SIZE", defaults.saldo_page_size),
            monobank_api_url: env::var("MONOBANK_API_URL").unwrap_or(defaults.monobank_api_url),
            monobank_account_id: env::var("MONOBANK_ACCOUNT_ID")
                .unwrap_or(defaults.monobank_account_id),
            monobank_token: non_empty("MONOBANK_TOKEN"),
            monobank_account_name: env::var("MONOBANK_ACCOUNT_NAME")
                .unwrap_or(defaults.monobank_account_name),
            sync_window_days: parsed("SYNC_WINDOW_DAYS", defaults.sync_window_days),
            sync_interval: Duration::from_secs(parsed("SYNC_INTERVAL_SECS", 0)),
            sync_on_startup: parsed("SYNC_ON_STARTUP", defaults.sync_on_startup),
            request_interval: Duration::from_millis(parsed(
                "REQUEST_INTERVAL_MS",
                defaults.request_interval.as_millis() as u64,
            )),
            http_timeout_secs: parsed("HTTP_TIMEOUT_SECS", defaults.http_timeout_secs),
            max_rate_limit_retries: parsed("MAX_RATE_LIMIT_RETRIES", defaults.max_rate_limit_retries),
            clear_before_sync: parsed("CLEAR_BEFORE_SYNC", defaults.clear_before_sync),
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn parsed<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
