use crate::error::{ProxyError, Result};
use axum::http::HeaderValue;
use std::env;
use std::time::Duration;
use tracing::warn;
use walrus_aggregator_client::fetcher::{DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_MAX_BLOB_SIZE};
use walrus_aggregator_client::{browser_url, EndpointList, Network};

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_PROXY_PATH: &str = "/api/walrus-proxy";
pub const TEST_PROXY_PATH: &str = "/api/test-proxy";
pub const HEALTH_PATH: &str = "/health";
pub const DEFAULT_CONTENT_TYPE: &str = "image/png";
pub const DEFAULT_CACHE_MAX_AGE_SECS: u64 = 60 * 60;

/// Proxy configuration parsed from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub proxy_path: String,
    pub network: Network,
    pub aggregators: EndpointList,
    pub fetch_timeout: Duration,
    /// Served for every blob. Walrus does not report a content type, and
    /// the uploader only ever stores PNG screenshots.
    pub content_type: HeaderValue,
    pub cache_max_age_secs: u64,
    pub max_blob_size: u64,
    /// Public origin of the deployment, used to print absolute proxy links
    pub public_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            proxy_path: DEFAULT_PROXY_PATH.to_string(),
            network: Network::Testnet,
            aggregators: EndpointList::aggregators_for(Network::Testnet).unwrap_or_default(),
            fetch_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            content_type: HeaderValue::from_static(DEFAULT_CONTENT_TYPE),
            cache_max_age_secs: DEFAULT_CACHE_MAX_AGE_SECS,
            max_blob_size: DEFAULT_MAX_BLOB_SIZE,
            public_url: None,
        }
    }
}

impl Config {
    /// Parse configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Parse configuration from any key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = lookup("PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let proxy_path = parse_proxy_path(lookup("PROXY_PATH"))?;

        let network = match lookup("WALRUS_NETWORK") {
            Some(name) => Network::from_name(&name).unwrap_or_else(|| {
                warn!(network = %name, "Unknown Walrus network, using testnet");
                Network::Testnet
            }),
            None => Network::Testnet,
        };

        let aggregators = match lookup("WALRUS_AGGREGATORS") {
            Some(list) if !list.trim().is_empty() => EndpointList::parse_list(&list)?,
            _ => EndpointList::aggregators_for(network)?,
        };
        if aggregators.is_empty() {
            return Err(ProxyError::Config(
                "at least one aggregator is required".to_string(),
            ));
        }

        let fetch_timeout = lookup("FETCH_TIMEOUT_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_ATTEMPT_TIMEOUT);

        let content_type = match lookup("BLOB_CONTENT_TYPE") {
            Some(ct) => HeaderValue::from_str(ct.trim())
                .map_err(|_| ProxyError::Config(format!("invalid BLOB_CONTENT_TYPE: {}", ct)))?,
            None => HeaderValue::from_static(DEFAULT_CONTENT_TYPE),
        };

        let cache_max_age_secs = lookup("CACHE_MAX_AGE_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_CACHE_MAX_AGE_SECS);

        let max_blob_size = lookup("MAX_BLOB_SIZE")
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_MAX_BLOB_SIZE);

        let public_url = match lookup("PUBLIC_URL") {
            Some(url) if !url.trim().is_empty() => {
                let url = url.trim().to_string();
                browser_url(&url, &proxy_path, "blob")
                    .map_err(|e| ProxyError::Config(format!("invalid PUBLIC_URL: {}", e)))?;
                Some(url)
            }
            _ => None,
        };

        Ok(Self {
            port,
            proxy_path,
            network,
            aggregators,
            fetch_timeout,
            content_type,
            cache_max_age_secs,
            max_blob_size,
            public_url,
        })
    }
}

fn parse_proxy_path(raw: Option<String>) -> Result<String> {
    let raw = match raw {
        Some(p) if !p.trim().is_empty() => p.trim().to_string(),
        _ => return Ok(DEFAULT_PROXY_PATH.to_string()),
    };

    let path = if raw.starts_with('/') {
        raw
    } else {
        format!("/{}", raw)
    };

    if path.contains(['{', '}', '*', '?']) {
        return Err(ProxyError::Config(format!(
            "PROXY_PATH must be a literal path: {}",
            path
        )));
    }
    if path == HEALTH_PATH || path == TEST_PROXY_PATH {
        return Err(ProxyError::Config(format!(
            "PROXY_PATH collides with a built-in route: {}",
            path
        )));
    }

    Ok(path)
}
