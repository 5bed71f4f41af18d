//! HTTP server for the proxy endpoints
//!
//! Serves the blob proxy route (`/api/walrus-proxy` by default) plus
//! `/api/test-proxy` and `/health`.

use crate::config::{Config, HEALTH_PATH, TEST_PROXY_PATH};
use crate::error::ApiError;
use crate::types::{BlobQuery, HealthResponse, TestProxyEndpoints, TestProxyResponse};
use axum::{
    body::Body,
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::{DateTime, SecondsFormat, Utc};
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{debug, info};
use walrus_aggregator_client::{browser_url, BlobFetcher};

/// Shared state for the HTTP server
pub struct ServerState {
    pub fetcher: BlobFetcher,
    pub config: Config,
    pub started_at: DateTime<Utc>,
}

impl ServerState {
    pub fn new(fetcher: BlobFetcher, config: Config) -> Self {
        Self {
            fetcher,
            config,
            started_at: Utc::now(),
        }
    }
}

pub type SharedState = Arc<ServerState>;

/// Create the HTTP router
pub fn create_router(state: SharedState) -> Router {
    let proxy = with_proxy_layers(Router::new().route(
        &state.config.proxy_path,
        get(get_blob)
            .head(method_not_allowed)
            .options(preflight)
            .fallback(method_not_allowed),
    ));

    Router::new()
        .route(HEALTH_PATH, get(health))
        .route(TEST_PROXY_PATH, get(test_proxy))
        .merge(proxy)
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}

/// CORS headers for every proxy response. Panics are caught inside them so
/// a 500 stays readable from the browser.
fn with_proxy_layers(router: Router<SharedState>) -> Router<SharedState> {
    router
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        ))
}

/// Start the HTTP server
pub async fn start_server(state: SharedState, port: u16) -> std::io::Result<()> {
    let router = create_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await
}

/// Fetch a blob through the aggregator chain and serve it inline
async fn get_blob(
    State(state): State<SharedState>,
    query: Result<Query<BlobQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let blob_id = match query {
        Ok(Query(query)) => query.blob_id.filter(|id| !id.is_empty()),
        Err(e) => {
            debug!(error = %e, "Rejected query string");
            None
        }
    }
    .ok_or(ApiError::MissingBlobId)?;

    let blob = state.fetcher.fetch(&blob_id).await?;
    debug!(blob_id = %blob_id, endpoint = %blob.endpoint, "Serving blob");

    blob_response(&state.config, blob.data)
}

fn blob_response(config: &Config, data: Vec<u8>) -> Result<Response, ApiError> {
    let cache_control = format!("public, max-age={}", config.cache_max_age_secs);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, config.content_type.clone())
        .header(header::CONTENT_LENGTH, data.len())
        .header(header::CACHE_CONTROL, cache_control)
        .body(Body::from(data))
        .map_err(|e| ApiError::Internal(e.to_string()))
}

/// CORS preflight; the headers come from the route layers
async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

/// Describe the proxy so a deployment can be checked from a browser
async fn test_proxy(State(state): State<SharedState>) -> impl IntoResponse {
    let proxy_path = &state.config.proxy_path;
    let relative = format!("{}?blobId=YOUR_BLOB_ID", proxy_path);
    let proxy = match &state.config.public_url {
        Some(base) => browser_url(base, proxy_path, "YOUR_BLOB_ID").unwrap_or(relative),
        None => relative,
    };

    let body = TestProxyResponse {
        message: "Walrus Proxy is working!".to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        endpoints: TestProxyEndpoints {
            proxy: proxy.clone(),
            test: TEST_PROXY_PATH.to_string(),
        },
        instructions: vec![
            "1. Upload an image to Walrus and copy its blob ID".to_string(),
            format!("2. Open {}", proxy),
            "3. The image should display in the browser instead of downloading".to_string(),
        ],
    };

    (
        [(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")],
        Json(body),
    )
}

/// Health check endpoint
async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs: uptime_secs(state.started_at, Utc::now()),
        network: state.config.network.to_string(),
        aggregators: state.fetcher.aggregators().base_urls(),
    })
}

/// Whole seconds between `started_at` and `now`, zero if the clock went backwards
fn uptime_secs(started_at: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    (now - started_at).num_seconds().max(0) as u64
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let details = if let Some(msg) = err.downcast_ref::<String>() {
        msg.clone()
    } else if let Some(msg) = err.downcast_ref::<&str>() {
        msg.to_string()
    } else {
        "handler panicked".to_string()
    };

    ApiError::Internal(details).into_response()
}
