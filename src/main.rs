// Load configuration
// Set up logging
// Open the transaction store
// Start the sync task (once at startup and/or on an interval)
// Start HTTP server with graceful shutdown

use bank_feed_service::{api, config::Config, state::AppState, SyncService, TransactionStore};

use std::future::IntoFuture;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting bank-feed-service");

    // Load configuration
    let config = Config::from_env();
    info!("Configuration loaded: database {}, static dir {}", config.database_url, config.static_dir);

    // Open the store
    let store = TransactionStore::open(&config.database_url).await?;
    info!("Database connection established");

    // Create shared state
    let app_state = Arc::new(AppState::new(config.clone(), store.clone()));

    let sync = SyncService::from_config(&config, store.clone(), Some(app_state.cache.clone()))?;

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
        }
        info!("Shutdown signal received");
        signal_token.cancel();
    });

    // Start HTTP server
    let app = api::create_router(app_state);
    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Starting server on {}", addr);

    let server_shutdown = shutdown.clone();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move { server_shutdown.cancelled().await })
        .into_future();

    let sync_task = async {
        if sync.has_sources() {
            sync.run_periodic(config.sync_interval, config.sync_on_startup, shutdown.clone())
                .await;
        }
    };

    let (served, ()) = tokio::join!(server, sync_task);
    served?;

    store.close().await;
    info!("bank-feed-service stopped");

    Ok(())
}
