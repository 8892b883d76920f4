//! API error type and its JSON failure envelope.

use crate::store::StoreError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::Store(StoreError::Unavailable { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Store(StoreError::Malformed { .. }) => StatusCode::BAD_GATEWAY,
        };

        error!("Request failed: {}", self);

        (
            status,
            Json(json!({
                "success": false,
                "error": self.to_string(),
            })),
        )
            .into_response()
    }
}
