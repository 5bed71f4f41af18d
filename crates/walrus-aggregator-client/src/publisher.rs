//! Blob uploads through Walrus publishers

use crate::endpoint::{Endpoint, EndpointList};
use crate::error::{AggregatorError, Result};
use crate::fetcher::{
    FetchFailure, DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_MAX_BLOB_SIZE, DEFAULT_USER_AGENT,
};
use crate::types::WalrusBlobResponse;
use reqwest::{header, Client};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

/// Upload settings shared by every publisher attempt
#[derive(Debug, Clone)]
pub struct PublisherOptions {
    pub attempt_timeout: Duration,
    pub user_agent: String,
    /// Uploads larger than this are refused without contacting a publisher
    pub max_blob_size: u64,
    /// Storage epochs to pay for
    pub epochs: u32,
    pub deletable: bool,
}

impl Default for PublisherOptions {
    fn default() -> Self {
        Self {
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_blob_size: DEFAULT_MAX_BLOB_SIZE,
            epochs: 1,
            deletable: false,
        }
    }
}

/// A successful upload
#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub endpoint: Endpoint,
    pub blob_id: String,
    pub response: WalrusBlobResponse,
}

/// Stores blobs on the first publisher in the list that accepts them
pub struct BlobPublisher {
    client: Client,
    publishers: EndpointList,
    options: PublisherOptions,
}

impl BlobPublisher {
    pub fn new(publishers: EndpointList, options: PublisherOptions) -> Result<Self> {
        let client = Client::builder()
            .timeout(options.attempt_timeout)
            .user_agent(options.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            publishers,
            options,
        })
    }

    pub fn publishers(&self) -> &EndpointList {
        &self.publishers
    }

    /// Upload raw bytes; an empty `content_type` is sent as `application/octet-stream`
    pub async fn store_blob(&self, data: Vec<u8>, content_type: &str) -> Result<StoredBlob> {
        let content_type = if content_type.is_empty() {
            "application/octet-stream"
        } else {
            content_type
        };
        self.store(data, content_type).await
    }

    /// Upload text as `text/plain`
    pub async fn store_string(&self, content: &str) -> Result<StoredBlob> {
        self.store(content.as_bytes().to_vec(), "text/plain").await
    }

    async fn store(&self, data: Vec<u8>, content_type: &str) -> Result<StoredBlob> {
        let size = data.len() as u64;
        if size > self.options.max_blob_size {
            return Err(AggregatorError::TooLarge {
                size,
                limit: self.options.max_blob_size,
            });
        }

        let mut last_error = None;

        for endpoint in &self.publishers {
            info!(endpoint = %endpoint, size, "Uploading blob to publisher");

            match self.store_at(endpoint, data.clone(), content_type).await {
                Ok((blob_id, response)) => {
                    info!(endpoint = %endpoint, blob_id = %blob_id, "Stored blob");
                    return Ok(StoredBlob {
                        endpoint: endpoint.clone(),
                        blob_id,
                        response,
                    });
                }
                Err(failure) => {
                    warn!(endpoint = %endpoint, error = %failure, "Publisher failed");
                    last_error = Some(failure);
                }
            }
        }

        error!(last_error = ?last_error, "All publishers failed");
        Err(AggregatorError::Exhausted { last_error })
    }

    /// Publisher URL with the storage query parameters applied
    pub fn store_url(&self, endpoint: &Endpoint) -> std::result::Result<Url, FetchFailure> {
        let mut url = Url::parse(&endpoint.blobs_url())
            .map_err(|e| FetchFailure::Transport(e.to_string()))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("epochs", &self.options.epochs.to_string());
            if self.options.deletable {
                query.append_pair("deletable", "true");
            }
        }
        Ok(url)
    }

    async fn store_at(
        &self,
        endpoint: &Endpoint,
        data: Vec<u8>,
        content_type: &str,
    ) -> std::result::Result<(String, WalrusBlobResponse), FetchFailure> {
        let url = self.store_url(endpoint)?;
        debug!(url = %url, "Storing blob");

        let response = self
            .client
            .put(url)
            .header(header::CONTENT_TYPE, content_type)
            .body(data)
            .send()
            .await
            .map_err(|e| FetchFailure::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::from_status(status));
        }

        let body: WalrusBlobResponse = response
            .json()
            .await
            .map_err(|e| FetchFailure::InvalidResponse(e.to_string()))?;

        match body.blob_id() {
            Some(blob_id) => Ok((blob_id.to_string(), body)),
            None => Err(FetchFailure::InvalidResponse(
                "response carries no blob ID".to_string(),
            )),
        }
    }
}
