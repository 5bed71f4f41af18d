//! Error types for the Walrus aggregator client

use crate::fetcher::FetchFailure;
use std::fmt;

#[derive(Debug)]
pub enum AggregatorError {
    /// HTTP client could not be built
    Http(Box<reqwest::Error>),
    /// Aggregator base URL failed validation
    InvalidEndpoint(String),
    /// Upload refused before any request was made
    TooLarge { size: u64, limit: u64 },
    /// Every endpoint failed; carries the failure of the last one tried
    Exhausted { last_error: Option<FetchFailure> },
}

impl AggregatorError {
    /// Message of the last aggregator failure, if any aggregator was tried
    pub fn last_error_message(&self) -> Option<String> {
        match self {
            AggregatorError::Exhausted { last_error } => {
                last_error.as_ref().map(|e| e.to_string())
            }
            _ => None,
        }
    }
}

impl fmt::Display for AggregatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregatorError::Http(err) => write!(f, "HTTP error: {}", err),
            AggregatorError::InvalidEndpoint(msg) => {
                write!(f, "Invalid aggregator endpoint: {}", msg)
            }
            AggregatorError::TooLarge { size, limit } => write!(
                f,
                "File size {} bytes exceeds maximum allowed size of {} bytes",
                size, limit
            ),
            AggregatorError::Exhausted {
                last_error: Some(err),
            } => write!(f, "All endpoints failed, last error: {}", err),
            AggregatorError::Exhausted { last_error: None } => {
                write!(f, "No endpoints configured")
            }
        }
    }
}

impl std::error::Error for AggregatorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AggregatorError::Http(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for AggregatorError {
    fn from(err: reqwest::Error) -> Self {
        AggregatorError::Http(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, AggregatorError>;
