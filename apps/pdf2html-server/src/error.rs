//! Error types for the PDF to HTML server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::converter::{ConvertError, PageRangeError};
use crate::record_store::{PayloadError, RecordStoreError};
use crate::source::{FetchError, UploadError};

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Shown with record-store 404s; an empty result is often a policy filter
pub const ROW_LEVEL_SECURITY_NOTE: &str = "This might be due to RLS policies. \
    Ensure proper authentication or use service role key.";

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {message}")]
    NotFound {
        message: String,
        note: Option<String>,
    },

    #[error("Record store not available")]
    Unavailable,

    #[error("Page range error: {0}")]
    PageRange(#[from] PageRangeError),

    #[error("Payload error: {0}")]
    Payload(#[from] PayloadError),

    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Record store error: {0}")]
    RecordStore(#[from] RecordStoreError),

    #[error("Conversion error: {0}")]
    Convert(#[from] ConvertError),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound {
            message: message.into(),
            note: None,
        }
    }

    /// Status code, machine-readable kind, and caller-facing message
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::NotFound { message, .. } => {
                (StatusCode::NOT_FOUND, "not_found", message.clone())
            }
            AppError::Unavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "unavailable",
                "Record store not available".to_string(),
            ),
            AppError::PageRange(e) => (StatusCode::BAD_REQUEST, "bad_request", e.to_string()),
            AppError::Payload(e) => {
                tracing::warn!("Rejected document payload: {}", e);
                let message = match e {
                    PayloadError::Empty => "Resume data is empty",
                    _ => "Invalid PDF data format",
                };
                (StatusCode::BAD_REQUEST, "invalid_payload", message.to_string())
            }
            AppError::Upload(e) => match e {
                UploadError::TooLarge => {
                    (StatusCode::PAYLOAD_TOO_LARGE, "too_large", e.to_string())
                }
                UploadError::Storage(_) => {
                    tracing::error!("Upload storage error: {}", e);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "storage_error",
                        "Failed to store upload".to_string(),
                    )
                }
                _ => (StatusCode::BAD_REQUEST, "bad_request", e.to_string()),
            },
            AppError::Fetch(e) => match e {
                FetchError::InvalidUrl(_) => {
                    (StatusCode::BAD_REQUEST, "bad_request", e.to_string())
                }
                FetchError::Timeout(_) => {
                    tracing::warn!("Fetch timed out: {}", e);
                    (StatusCode::GATEWAY_TIMEOUT, "timeout", e.to_string())
                }
                FetchError::Io(_) => {
                    tracing::error!("Fetch IO error: {}", e);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "io_error",
                        "IO error".to_string(),
                    )
                }
                _ => {
                    tracing::error!("Fetch error: {}", e);
                    (StatusCode::BAD_GATEWAY, "upstream_error", e.to_string())
                }
            },
            AppError::RecordStore(RecordStoreError::Request(e)) if e.is_timeout() => {
                tracing::warn!("Record store query timed out: {}", e);
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    "timeout",
                    "Record store query timed out".to_string(),
                )
            }
            AppError::RecordStore(e) => {
                tracing::error!("Record store error: {}", e);
                (
                    StatusCode::BAD_GATEWAY,
                    "record_store_error",
                    "Record store query failed".to_string(),
                )
            }
            AppError::Convert(e) => match e {
                ConvertError::Timeout(_) => {
                    tracing::warn!("Conversion timed out: {}", e);
                    (StatusCode::GATEWAY_TIMEOUT, "timeout", e.to_string())
                }
                _ => {
                    tracing::error!("Conversion failed: {}", e);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "conversion_failed",
                        "PDF conversion failed".to_string(),
                    )
                }
            },
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error".to_string(),
                )
            }
            AppError::Io(e) => {
                tracing::error!("IO error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "io_error",
                    "IO error".to_string(),
                )
            }
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.parts().0
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = self.parts();

        let note = match &self {
            AppError::NotFound { note, .. } => note.clone(),
            _ => None,
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
            note,
            details: if cfg!(debug_assertions) {
                Some(self.to_string())
            } else {
                None
            },
        });

        (status, body).into_response()
    }
}

/// Plain-text rendering of [`AppError`] for the convert and upload routes
#[derive(Debug)]
pub struct PlainError(pub AppError);

impl From<AppError> for PlainError {
    fn from(err: AppError) -> Self {
        PlainError(err)
    }
}

impl IntoResponse for PlainError {
    fn into_response(self) -> Response {
        let (status, _, message) = self.0.parts();
        (status, message).into_response()
    }
}
