use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::store::StoreError;

#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    /// The store failed; details are logged, not returned.
    Unavailable,
}

impl AppError {
    pub fn property_not_found(id: i64) -> Self {
        Self::NotFound(format!("property {id} not found"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Unavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "temporarily unavailable".to_string(),
            ),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        error!(error = %e, "Store request failed");
        Self::Unavailable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_failures_hide_details_behind_503() {
        let resp = AppError::from(StoreError::Database(sqlx::Error::PoolTimedOut)).into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn missing_property_is_404() {
        let resp = AppError::property_not_found(3).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
