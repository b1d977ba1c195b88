// One sync pass over every configured provider, then exit.

use bank_feed_service::{config::Config, SyncService, TransactionStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let store = TransactionStore::open(&config.database_url).await?;

    if config.clear_before_sync {
        let removed = store.clear().await?;
        println!("Database cleared: {} transactions removed", removed);
    }

    let sync = SyncService::from_config(&config, store.clone(), None)?;
    if !sync.has_sources() {
        println!("No providers configured. Set SALDO_TOKEN/SALDO_ACCOUNT_ID or MONOBANK_TOKEN.");
    }

    let reports = sync.run_once().await?;
    for report in &reports {
        println!(
            "{}: {} fetched, {} normalized, {} dropped, {} inserted",
            report.source, report.fetched, report.normalized, report.dropped, report.inserted
        );
    }

    let inserted: u64 = reports.iter().map(|r| r.inserted).sum();
    println!(
        "Sync complete: {} new transactions, {} stored in total",
        inserted,
        store.count().await?
    );

    store.close().await;
    Ok(())
}
