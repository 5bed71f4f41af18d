//! Sequential blob fetching across aggregators

use crate::endpoint::{EndpointList, Endpoint};
use crate::error::{AggregatorError, Result};
use reqwest::{Client, StatusCode};
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// User agent sent with every aggregator request
pub const DEFAULT_USER_AGENT: &str = "Walrus-Proxy/1.0";

/// Default deadline for a single aggregator attempt
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

/// Largest blob moved through the client in either direction (10 MiB)
pub const DEFAULT_MAX_BLOB_SIZE: u64 = 10 * 1024 * 1024;

/// Why a single endpoint attempt failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    /// Aggregator answered with a non-2xx status
    Status { status: u16, reason: String },
    /// Request never produced a usable response (DNS, refused, reset, timeout)
    Transport(String),
    /// Body grew past the configured size limit
    TooLarge { limit: u64 },
    /// 2xx response whose body could not be understood
    InvalidResponse(String),
}

impl FetchFailure {
    pub(crate) fn from_status(status: StatusCode) -> Self {
        FetchFailure::Status {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("").to_string(),
        }
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchFailure::Status { status, reason } => write!(f, "HTTP {}: {}", status, reason),
            FetchFailure::Transport(msg) => f.write_str(msg),
            FetchFailure::TooLarge { limit } => {
                write!(f, "Blob exceeds maximum size of {} bytes", limit)
            }
            FetchFailure::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
        }
    }
}

/// Result of one aggregator attempt
#[derive(Debug)]
pub enum FetchOutcome {
    Success(Vec<u8>),
    Failure(FetchFailure),
}

/// Blob bytes together with the aggregator that served them
#[derive(Debug, Clone)]
pub struct FetchedBlob {
    pub endpoint: Endpoint,
    pub data: Vec<u8>,
}

/// HTTP client settings for aggregator requests
#[derive(Debug, Clone)]
pub struct FetcherOptions {
    pub attempt_timeout: Duration,
    pub user_agent: String,
    /// Responses larger than this are abandoned and count as a failure
    pub max_blob_size: u64,
}

impl Default for FetcherOptions {
    fn default() -> Self {
        Self {
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_blob_size: DEFAULT_MAX_BLOB_SIZE,
        }
    }
}

/// Fetches blobs from a fixed, ordered list of aggregators.
///
/// Aggregators are tried one at a time in list order and each gets exactly
/// one attempt per fetch. The first 2xx response wins; every other outcome
/// moves on to the next aggregator.
pub struct BlobFetcher {
    client: Client,
    aggregators: EndpointList,
    max_blob_size: u64,
}

impl BlobFetcher {
    pub fn new(aggregators: EndpointList, options: FetcherOptions) -> Result<Self> {
        let client = Client::builder()
            .timeout(options.attempt_timeout)
            .user_agent(options.user_agent)
            .build()?;

        Ok(Self {
            client,
            aggregators,
            max_blob_size: options.max_blob_size,
        })
    }

    pub fn aggregators(&self) -> &EndpointList {
        &self.aggregators
    }

    /// Fetch `blob_id`, falling back through the aggregator list
    pub async fn fetch(&self, blob_id: &str) -> Result<FetchedBlob> {
        let mut last_error = None;

        for endpoint in &self.aggregators {
            info!(endpoint = %endpoint, blob_id, "Trying aggregator");

            match self.try_endpoint(endpoint, blob_id).await {
                FetchOutcome::Success(data) => {
                    info!(
                        endpoint = %endpoint,
                        blob_id,
                        size = data.len(),
                        "Fetched blob from aggregator"
                    );
                    return Ok(FetchedBlob {
                        endpoint: endpoint.clone(),
                        data,
                    });
                }
                FetchOutcome::Failure(failure) => {
                    warn!(endpoint = %endpoint, blob_id, error = %failure, "Aggregator failed");
                    last_error = Some(failure);
                }
            }
        }

        error!(blob_id, last_error = ?last_error, "All aggregators failed");
        Err(AggregatorError::Exhausted { last_error })
    }

    /// Make a single attempt against one aggregator
    pub async fn try_endpoint(&self, endpoint: &Endpoint, blob_id: &str) -> FetchOutcome {
        let url = endpoint.blob_url(blob_id);
        debug!(url = %url, "Fetching blob");

        let mut response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => return FetchOutcome::Failure(FetchFailure::Transport(e.to_string())),
        };

        let status = response.status();
        if !status.is_success() {
            return FetchOutcome::Failure(FetchFailure::from_status(status));
        }

        let limit = self.max_blob_size;
        if response.content_length().is_some_and(|len| len > limit) {
            return FetchOutcome::Failure(FetchFailure::TooLarge { limit });
        }

        // Content-Length may be absent or wrong, so the cap is enforced while reading
        let mut data = Vec::new();
        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    if (data.len() + chunk.len()) as u64 > limit {
                        return FetchOutcome::Failure(FetchFailure::TooLarge { limit });
                    }
                    data.extend_from_slice(&chunk);
                }
                Ok(None) => return FetchOutcome::Success(data),
                Err(e) => return FetchOutcome::Failure(FetchFailure::Transport(e.to_string())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Path, http::StatusCode as AxumStatus, routing::get, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x01];

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    /// Fake aggregator answering every blob request with `status` and `body`
    async fn fake_aggregator(status: u16, body: &'static [u8], hits: Arc<AtomicUsize>) -> String {
        let router = Router::new().route(
            "/v1/blobs/{blob_id}",
            get(move |Path(_blob_id): Path<String>| {
                let hits = hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    (AxumStatus::from_u16(status).unwrap(), body)
                }
            }),
        );
        serve(router).await
    }

    /// Base URL of a port nothing listens on
    async fn refused_endpoint() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}", addr)
    }

    fn fetcher<S: AsRef<str>>(urls: &[S]) -> BlobFetcher {
        let urls: Vec<&str> = urls.iter().map(|u| u.as_ref()).collect();
        let list = EndpointList::parse_list(&urls.join(",")).unwrap();
        BlobFetcher::new(list, FetcherOptions::default()).unwrap()
    }

    #[tokio::test]
    async fn test_first_aggregator_success() {
        let hits = Arc::new(AtomicUsize::new(0));
        let first = fake_aggregator(200, PNG, hits.clone()).await;
        let fetcher = fetcher(&[&first]);

        let blob = fetcher.fetch("abc123").await.unwrap();
        assert_eq!(blob.data, PNG);
        assert_eq!(blob.endpoint.base_url(), first);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_falls_back_after_error_status() {
        let first_hits = Arc::new(AtomicUsize::new(0));
        let second_hits = Arc::new(AtomicUsize::new(0));
        let third_hits = Arc::new(AtomicUsize::new(0));
        let first = fake_aggregator(503, b"", first_hits.clone()).await;
        let second = fake_aggregator(200, PNG, second_hits.clone()).await;
        let third = fake_aggregator(200, b"other", third_hits.clone()).await;
        let fetcher = fetcher(&[&first, &second, &third]);

        let blob = fetcher.fetch("abc123").await.unwrap();
        assert_eq!(blob.data, PNG);
        assert_eq!(blob.endpoint.base_url(), second);
        assert_eq!(first_hits.load(Ordering::SeqCst), 1);
        assert_eq!(second_hits.load(Ordering::SeqCst), 1);
        assert_eq!(third_hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_falls_back_after_connection_refused() {
        let hits = Arc::new(AtomicUsize::new(0));
        let dead = refused_endpoint().await;
        let live = fake_aggregator(200, PNG, hits.clone()).await;
        let fetcher = fetcher(&[&dead, &live]);

        let blob = fetcher.fetch("abc123").await.unwrap();
        assert_eq!(blob.data, PNG);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_all_failed_reports_last_error() {
        let hits = Arc::new(AtomicUsize::new(0));
        let dead = refused_endpoint().await;
        let missing = fake_aggregator(404, b"", hits.clone()).await;
        let fetcher = fetcher(&[&dead, &missing]);

        let err = fetcher.fetch("abc123").await.unwrap_err();
        assert_eq!(
            err.last_error_message().as_deref(),
            Some("HTTP 404: Not Found")
        );
    }

    #[tokio::test]
    async fn test_all_failed_with_transport_error_last() {
        let hits = Arc::new(AtomicUsize::new(0));
        let unavailable = fake_aggregator(503, b"", hits.clone()).await;
        let dead = refused_endpoint().await;
        let fetcher = fetcher(&[&unavailable, &dead]);

        let err = fetcher.fetch("abc123").await.unwrap_err();
        match err {
            AggregatorError::Exhausted {
                last_error: Some(FetchFailure::Transport(msg)),
            } => assert!(!msg.is_empty()),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_list_has_no_last_error() {
        let fetcher = BlobFetcher::new(EndpointList::default(), FetcherOptions::default()).unwrap();
        let err = fetcher.fetch("abc123").await.unwrap_err();
        assert_eq!(err.last_error_message(), None);
    }

    #[tokio::test]
    async fn test_hanging_aggregator_times_out() {
        let slow = serve(Router::new().route(
            "/v1/blobs/{blob_id}",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                "late"
            }),
        ))
        .await;
        let hits = Arc::new(AtomicUsize::new(0));
        let live = fake_aggregator(200, PNG, hits.clone()).await;

        let list = EndpointList::parse_list(&format!("{},{}", slow, live)).unwrap();
        let options = FetcherOptions {
            attempt_timeout: Duration::from_millis(200),
            ..FetcherOptions::default()
        };
        let fetcher = BlobFetcher::new(list, options).unwrap();

        let blob = fetcher.fetch("abc123").await.unwrap();
        assert_eq!(blob.data, PNG);
        assert_eq!(blob.endpoint.base_url(), live);
    }

    #[tokio::test]
    async fn test_request_carries_blob_id_and_user_agent() {
        let seen: Arc<Mutex<Vec<(String, String)>>> = Arc::new(Mutex::new(Vec::new()));
        let recorder = seen.clone();
        let base = serve(Router::new().route(
            "/v1/blobs/{blob_id}",
            get(
                move |Path(blob_id): Path<String>, headers: axum::http::HeaderMap| {
                    let recorder = recorder.clone();
                    async move {
                        let agent = headers
                            .get("user-agent")
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or_default()
                            .to_string();
                        recorder.lock().unwrap().push((blob_id, agent));
                        PNG
                    }
                },
            ),
        ))
        .await;

        fetcher(&[&base]).fetch("abc123").await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(
            seen.as_slice(),
            &[("abc123".to_string(), "Walrus-Proxy/1.0".to_string())]
        );
    }

    #[tokio::test]
    async fn test_same_request_twice_is_identical() {
        let hits = Arc::new(AtomicUsize::new(0));
        let base = fake_aggregator(200, PNG, hits.clone()).await;
        let fetcher = fetcher(&[&base]);

        let first = fetcher.fetch("abc123").await.unwrap();
        let second = fetcher.fetch("abc123").await.unwrap();
        assert_eq!(first.data, second.data);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_oversized_blob_falls_back() {
        let big_hits = Arc::new(AtomicUsize::new(0));
        let small_hits = Arc::new(AtomicUsize::new(0));
        let big = fake_aggregator(200, &[0u8; 64], big_hits.clone()).await;
        let small = fake_aggregator(200, PNG, small_hits.clone()).await;

        let list = EndpointList::parse_list(&format!("{},{}", big, small)).unwrap();
        let options = FetcherOptions {
            max_blob_size: 16,
            ..FetcherOptions::default()
        };
        let fetcher = BlobFetcher::new(list, options).unwrap();

        let blob = fetcher.fetch("abc123").await.unwrap();
        assert_eq!(blob.data, PNG);
        assert_eq!(big_hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_oversized_blob_everywhere_reports_limit() {
        let hits = Arc::new(AtomicUsize::new(0));
        let big = fake_aggregator(200, &[0u8; 64], hits.clone()).await;
        let options = FetcherOptions {
            max_blob_size: 16,
            ..FetcherOptions::default()
        };
        let fetcher =
            BlobFetcher::new(EndpointList::parse_list(&big).unwrap(), options).unwrap();

        let err = fetcher.fetch("abc123").await.unwrap_err();
        assert_eq!(
            err.last_error_message().as_deref(),
            Some("Blob exceeds maximum size of 16 bytes")
        );
    }

    #[tokio::test]
    async fn test_blob_at_limit_is_accepted() {
        let hits = Arc::new(AtomicUsize::new(0));
        let base = fake_aggregator(200, PNG, hits.clone()).await;
        let options = FetcherOptions {
            max_blob_size: PNG.len() as u64,
            ..FetcherOptions::default()
        };
        let fetcher =
            BlobFetcher::new(EndpointList::parse_list(&base).unwrap(), options).unwrap();

        assert_eq!(fetcher.fetch("abc123").await.unwrap().data, PNG);
    }

    #[test]
    fn test_status_failure_message() {
        let failure = FetchFailure::from_status(StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(failure.to_string(), "HTTP 503: Service Unavailable");
    }
}
