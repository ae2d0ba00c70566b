use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

/// Request-terminal failures, returned as bare status codes with no body.
/// Validation failures never pass through here: handlers carry those in
/// the response body as `{ "errors": [...] }`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing, invalid, or expired credential on a strict endpoint.
    #[error("unauthorized")]
    Unauthorized,

    /// Authenticated but not entitled to the target resource.
    #[error("forbidden")]
    Forbidden,

    /// Target resource absent, or invisible to the caller.
    #[error("not found")]
    NotFound,

    /// Store or signing failure. Detail is logged, never returned.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(err) => {
                error!("internal error: {err:#}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        status.into_response()
    }
}
