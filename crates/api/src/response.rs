//! Shared API response types and error handling
//!
//! Every endpoint answers with the same `{message, data}` envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json as ResponseJson, Response},
};
use serde::Serialize;
use taskhub_db::DbError;
use thiserror::Error;
use tracing::error;

/// Standard API response wrapper; `data` is `null` on errors
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            message: "OK".to_string(),
            data: Some(data),
        }
    }

    pub fn created(data: T) -> Self {
        ApiResponse {
            message: "Created".to_string(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// An envelope carrying only a message
    pub fn message(message: impl Into<String>) -> Self {
        ApiResponse {
            message: message.into(),
            data: None,
        }
    }
}

/// Errors returned to HTTP clients
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Not found")]
    NotFound,

    /// Details are logged, never sent
    #[error("Server error")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::ValidationError { message } => ApiError::BadRequest(message),
            DbError::NotFound { .. } => ApiError::NotFound,
            other => {
                error!("Request failed: {}", other.full_message());
                ApiError::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status(),
            ResponseJson(ApiResponse::message(self.to_string())),
        )
            .into_response()
    }
}
