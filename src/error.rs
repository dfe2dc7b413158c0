//! Error taxonomy for the HTTP surface.
//!
//! Pipeline-execution failures never reach this module at request time; they
//! are recorded on the job by the orchestrator's background wrapper and only
//! ever surface to callers through polling.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed submission, rejected synchronously.
    #[error("invalid submission: {0}")]
    Validation(String),

    /// Unknown job id on a status lookup.
    #[error("job not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(id) => (StatusCode::NOT_FOUND, format!("job not found: {id}")),
            AppError::Store(StoreError::NotFound(id)) => {
                (StatusCode::NOT_FOUND, format!("job not found: {id}"))
            }
            AppError::Store(StoreError::Duplicate(id)) => {
                (StatusCode::CONFLICT, format!("duplicate job id: {id}"))
            }
            AppError::Store(e) => {
                tracing::error!(error = %e, "job store failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "job store failure".to_string(),
                )
            }
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_400() {
        let resp = AppError::Validation("uploaded file is empty".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn not_found_maps_to_404() {
        let resp = AppError::NotFound("abc".into()).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = AppError::Store(StoreError::NotFound("abc".into())).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn duplicate_maps_to_409() {
        let resp = AppError::Store(StoreError::Duplicate("abc".into())).into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn io_failures_map_to_500() {
        let io = std::io::Error::other("disk on fire");
        let resp = AppError::Store(StoreError::Io(io)).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
