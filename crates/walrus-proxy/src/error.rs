//! Error types for the Walrus proxy

use crate::types::ErrorResponse;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use std::fmt;
use walrus_aggregator_client::AggregatorError;

/// Startup and runtime errors of the service itself
#[derive(Debug)]
pub enum ProxyError {
    Aggregator(AggregatorError),
    Io(Box<std::io::Error>),
    Config(String),
}

impl fmt::Display for ProxyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyError::Aggregator(err) => write!(f, "Aggregator error: {}", err),
            ProxyError::Io(err) => write!(f, "IO error: {}", err),
            ProxyError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for ProxyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProxyError::Aggregator(err) => Some(err),
            ProxyError::Io(err) => Some(err.as_ref()),
            ProxyError::Config(_) => None,
        }
    }
}

impl From<AggregatorError> for ProxyError {
    fn from(err: AggregatorError) -> Self {
        ProxyError::Aggregator(err)
    }
}

impl From<std::io::Error> for ProxyError {
    fn from(err: std::io::Error) -> Self {
        ProxyError::Io(Box::new(err))
    }
}

impl From<tracing_subscriber::filter::ParseError> for ProxyError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        ProxyError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;

/// Request failures, each mapped to a status code and JSON error body
#[derive(Debug)]
pub enum ApiError {
    MethodNotAllowed,
    MissingBlobId,
    /// No aggregator served the blob
    BlobUnavailable { details: Option<String> },
    Internal(String),
}

impl From<AggregatorError> for ApiError {
    fn from(err: AggregatorError) -> Self {
        match err {
            AggregatorError::Exhausted { last_error } => ApiError::BlobUnavailable {
                details: last_error.map(|e| e.to_string()),
            },
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                ErrorResponse::new("Method not allowed"),
            ),
            ApiError::MissingBlobId => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("Blob ID is required"),
            ),
            ApiError::BlobUnavailable { details } => (
                StatusCode::NOT_FOUND,
                ErrorResponse {
                    error: "Image not found or all aggregators unavailable".to_string(),
                    details,
                },
            ),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        error: "Internal server error".to_string(),
                        details: Some(msg),
                    },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
