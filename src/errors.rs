use crate::services::{metadata_index::IndexError, object_store::ObjectStoreError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use thiserror::Error;

/// Outcomes of the ingest, query and delete orchestrators that are not a plain success.
#[derive(Debug, Error)]
pub enum InboxError {
    #[error("batch must contain between 1 and {max} files, got {got}")]
    InvalidBatchSize { got: usize, max: usize },
    #[error("invalid date range: {0}")]
    InvalidRange(String),
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("no matching records")]
    NoMatchingRecords,
}

pub type InboxResult<T> = Result<T, InboxError>;

impl From<IndexError> for InboxError {
    fn from(err: IndexError) -> Self {
        InboxError::BackendUnavailable(err.to_string())
    }
}

impl From<ObjectStoreError> for InboxError {
    fn from(err: ObjectStoreError) -> Self {
        InboxError::BackendUnavailable(err.to_string())
    }
}

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<InboxError> for AppError {
    fn from(err: InboxError) -> Self {
        let status = match &err {
            InboxError::InvalidBatchSize { .. } | InboxError::InvalidRange(_) => {
                StatusCode::BAD_REQUEST
            }
            InboxError::NoMatchingRecords => StatusCode::NOT_FOUND,
            InboxError::BackendUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        AppError::new(status, err.to_string())
    }
}
