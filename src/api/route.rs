use crate::{
    api::{
        error::ApiError,
        response::{with_total_count, ApiResponse},
    },
    cache::CacheKey,
    reports::expenses_by_category,
    state::AppState,
    validation::{day_range_to_millis, parse_day, parse_limit},
};
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::{FixedOffset, Local};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{debug, info};

// GET /transactions and /transactions/expenses query parameters
#[derive(Debug, Deserialize)]
pub struct TransactionsQuery {
    start_date: Option<String>,
    end_date: Option<String>,
}

impl TransactionsQuery {
    /// Inclusive millisecond bounds covering the requested calendar days,
    /// taken at `utc_offset` or in the server's local zone.
    fn millis_range(
        &self,
        utc_offset: Option<FixedOffset>,
    ) -> Result<(Option<i64>, Option<i64>), ApiError> {
        let start = parse_day("start_date", self.start_date.as_deref())?;
        let end = parse_day("end_date", self.end_date.as_deref())?;

        let range = match utc_offset {
            Some(offset) => day_range_to_millis(start, end, &offset)?,
            None => day_range_to_millis(start, end, &Local)?,
        };
        Ok(range)
    }
}

// GET /transactions/recent query parameters
#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    limit: Option<String>,
}

// Create router with all routes; anything else is served from the static directory
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let static_files = ServeDir::new(&app_state.config.static_dir);

    Router::new()
        .route("/transactions", get(get_transactions))
        .route("/transactions/recent", get(get_recent_transactions))
        .route("/transactions/expenses", get(get_expenses))
        .fallback_service(static_files)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

// GET /transactions handler
async fn get_transactions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TransactionsQuery>,
) -> Result<Response, ApiError> {
    debug!("Received transactions request: {:?}", params);

    let (start, end) = params.millis_range(state.config.utc_offset)?;
    debug!("Date range in timestamps: {:?} to {:?}", start, end);

    let rows = state
        .cache
        .get_or_load(CacheKey::range(start, end), state.store.query(start, end))
        .await?;

    info!("Retrieved {} transactions", rows.len());
    Ok(with_total_count(rows.as_slice(), rows.len()))
}

// GET /transactions/recent handler
async fn get_recent_transactions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RecentQuery>,
) -> Result<Response, ApiError> {
    let limit = parse_limit(params.limit.as_deref(), state.config.recent_limit)?;

    let rows = state
        .cache
        .get_or_load(CacheKey::recent(limit), state.store.recent(limit))
        .await?;

    debug!("Retrieved {} recent transactions", rows.len());
    Ok(ApiResponse::success(rows.as_slice()).into_response())
}

// GET /transactions/expenses handler
async fn get_expenses(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TransactionsQuery>,
) -> Result<Response, ApiError> {
    let (start, end) = params.millis_range(state.config.utc_offset)?;

    let rows = state
        .cache
        .get_or_load(CacheKey::range(start, end), state.store.query(start, end))
        .await?;

    let totals = expenses_by_category(&rows);
    debug!("Summarized {} expense categories from {} transactions", totals.len(), rows.len());

    Ok(ApiResponse::success(totals).into_response())
}
