//! Error types for the data backend and the HTTP layer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Failure reported by a backend client call
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("storage error: {0}")]
    Storage(#[from] redb::Error),

    #[error("malformed row: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The row-level access policy rejected the write
    #[error("new row violates row-level security policy for table \"{0}\"")]
    PolicyViolation(String),

    #[error("change feed closed")]
    Closed,
}

macro_rules! storage_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for BackendError {
                fn from(err: $ty) -> Self {
                    BackendError::Storage(err.into())
                }
            }
        )*
    };
}

storage_from!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

/// Error returned by HTTP handlers
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_input"),
            AppError::Backend(BackendError::PolicyViolation(_)) => {
                (StatusCode::FORBIDDEN, "forbidden")
            }
            AppError::Backend(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };

        // Storage details stay in the operator log.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message, "code": code }))).into_response()
    }
}
