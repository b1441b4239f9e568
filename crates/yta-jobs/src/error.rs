//! Orchestrator API error type and its HTTP status-code mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("storage error: {0}")]
    Storage(#[from] yta_storage::StorageError),

    #[error("registry error: {0}")]
    Registry(#[from] yta_registry::RegistryError),

    #[error("download error: {0}")]
    Download(#[from] yta_download::DownloadError),

    #[error("metadata error: {0}")]
    Metadata(#[from] yta_metadata::MetadataError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Metadata(yta_metadata::MetadataError::QuotaExceeded) => {
                StatusCode::TOO_MANY_REQUESTS
            }
            ApiError::Metadata(yta_metadata::MetadataError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Metadata(yta_metadata::MetadataError::Forbidden(_)) => StatusCode::FORBIDDEN,
            ApiError::Download(yta_download::DownloadError::TaskNotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            ApiError::Download(yta_download::DownloadError::TaskAlreadyTerminal(_))
            | ApiError::Download(yta_download::DownloadError::UnknownQuality(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Registry(yta_registry::RegistryError::NotFound(_)) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = if status == StatusCode::INTERNAL_SERVER_ERROR
            && std::env::var("ENVIRONMENT").unwrap_or_default() == "production"
        {
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };
        (status, Json(ErrorResponse { detail })).into_response()
    }
}
