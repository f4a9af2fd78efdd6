//! HTTP error mapping for the service surfaces.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Error reply for any service endpoint; renders as
/// `{"status": "error", "message": …}` with the mapped status code.
#[derive(Debug)]
pub enum ApiError {
    Core(corelib::Error),
    Coordination(coordination::Error),
    NotFound(String),
    InvalidArgument(String),
}

impl From<corelib::Error> for ApiError {
    fn from(err: corelib::Error) -> Self {
        ApiError::Core(err)
    }
}

impl From<coordination::Error> for ApiError {
    fn from(err: coordination::Error) -> Self {
        ApiError::Coordination(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Core(err) => {
                let status = match err {
                    corelib::Error::NoServersAvailable => StatusCode::INTERNAL_SERVER_ERROR,
                    corelib::Error::NotFound(_) => StatusCode::NOT_FOUND,
                    corelib::Error::InvalidArgument(_) => StatusCode::BAD_REQUEST,
                    corelib::Error::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.to_string())
            }
            ApiError::Coordination(err) => {
                let status = match err {
                    coordination::Error::LockAlreadyHeld { .. } => StatusCode::CONFLICT,
                    coordination::Error::InvalidPath { .. } => StatusCode::BAD_REQUEST,
                };
                (status, err.to_string())
            }
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message.clone()),
            ApiError::InvalidArgument(message) => (StatusCode::BAD_REQUEST, message.clone()),
        };
        (
            status,
            Json(json!({ "status": "error", "message": message })),
        )
            .into_response()
    }
}
