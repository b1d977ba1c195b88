use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::db::StoreError;
use crate::validation::ValidationError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(#[from] ValidationError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(e) => {
                error!("Error fetching transactions: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "status": "error",
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}
