//! Request and response types for the Walrus proxy

use serde::{Deserialize, Serialize};

/// Query string of the proxy route
#[derive(Debug, Deserialize)]
pub struct BlobQuery {
    #[serde(rename = "blobId", default)]
    pub blob_id: Option<String>,
}

/// JSON body of every error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: &str) -> Self {
        Self {
            error: error.to_string(),
            details: None,
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub network: String,
    pub aggregators: Vec<String>,
}

/// Self-description returned by the test route
#[derive(Debug, Serialize)]
pub struct TestProxyResponse {
    pub message: String,
    pub timestamp: String,
    pub endpoints: TestProxyEndpoints,
    pub instructions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct TestProxyEndpoints {
    pub proxy: String,
    pub test: String,
}
