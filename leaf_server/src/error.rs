//! Errors returned by the HTTP endpoints.
//!
use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::protocol::ErrorBody;
use thiserror::Error;

use crate::inferer::InferError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Model not loaded yet. Please wait and retry.")]
    NotReady,
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("Too many pending predictions. Please retry.")]
    Busy,
    #[error("No file provided. Use 'file' field in multipart form.")]
    MissingFile,
    #[error("Empty filename")]
    EmptyFilename,
    #[error("Invalid multipart request: {0}")]
    Multipart(String),
    #[error("Upload too large: {0}")]
    PayloadTooLarge(String),
    #[error("Invalid image: {0}")]
    InvalidImage(String),
    #[error("Disease '{0}' not found")]
    UnknownDisease(String),
    #[error("Endpoint not found")]
    NotFound,
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotReady | ApiError::ModelUnavailable(_) | ApiError::Busy => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::MissingFile
            | ApiError::EmptyFilename
            | ApiError::Multipart(_)
            | ApiError::InvalidImage(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::UnknownDisease(_) | ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<InferError> for ApiError {
    fn from(err: InferError) -> Self {
        match err {
            InferError::NotReady => ApiError::NotReady,
            InferError::Unavailable(reason) => ApiError::ModelUnavailable(reason),
            InferError::Busy => ApiError::Busy,
            other @ (InferError::WorkerGone | InferError::Model(_)) => {
                ApiError::Internal(other.to_string())
            }
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(err.body_text())
        } else {
            ApiError::Multipart(err.body_text())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::warn!("Request failed: {self}");
        } else {
            log::debug!("Rejected request: {self}");
        }
        let body = ErrorBody {
            error: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::NotReady.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(ApiError::EmptyFilename.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::PayloadTooLarge("limit".into()).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ApiError::UnknownDisease("x".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(InferError::Model(anyhow::anyhow!("boom"))).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(InferError::Unavailable("gone".into())).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            ApiError::UnknownDisease("Rust".into()).to_string(),
            "Disease 'Rust' not found"
        );
        assert_eq!(
            ApiError::MissingFile.to_string(),
            "No file provided. Use 'file' field in multipart form."
        );
    }
}
