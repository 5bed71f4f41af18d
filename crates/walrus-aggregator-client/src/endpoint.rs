//! Aggregator endpoints and the built-in network lists

use crate::error::{AggregatorError, Result};
use std::fmt;
use url::Url;

/// Path under an aggregator base URL that serves blobs by ID
pub const BLOBS_PATH: &str = "v1/blobs";

const TESTNET_AGGREGATORS: &[&str] = &[
    "https://aggregator.walrus-testnet.walrus.space",
    "https://aggregator.testnet.walrus.atalma.io",
    "https://aggregator.walrus-01.tududes.com",
    "https://aggregator.walrus.banansen.dev",
];

const MAINNET_AGGREGATORS: &[&str] = &["https://aggregator.walrus-mainnet.walrus.space"];

const TESTNET_PUBLISHERS: &[&str] = &[
    "https://publisher.walrus-testnet.walrus.space",
    "https://publisher.testnet.walrus.atalma.io",
    "https://publisher.walrus-01.tududes.com",
    "https://publisher.walrus.banansen.dev",
];

const MAINNET_PUBLISHERS: &[&str] = &["https://publisher.walrus-mainnet.walrus.space"];

/// Walrus network whose public aggregators are used by default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Network {
    #[default]
    Testnet,
    Mainnet,
}

impl Network {
    /// Parse a network name (`testnet` or `mainnet`, case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "testnet" => Some(Self::Testnet),
            "mainnet" => Some(Self::Mainnet),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Testnet => "testnet",
            Self::Mainnet => "mainnet",
        }
    }

    /// Public aggregators for this network, in fallback order
    pub fn default_aggregators(&self) -> &'static [&'static str] {
        match self {
            Self::Testnet => TESTNET_AGGREGATORS,
            Self::Mainnet => MAINNET_AGGREGATORS,
        }
    }

    /// Public publishers for this network, primary first
    pub fn default_publishers(&self) -> &'static [&'static str] {
        match self {
            Self::Testnet => TESTNET_PUBLISHERS,
            Self::Mainnet => MAINNET_PUBLISHERS,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Base URL of a single aggregator or publisher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base: String,
}

impl Endpoint {
    /// Validate and normalize an aggregator base URL.
    ///
    /// The URL must be absolute `http` or `https` with a host and no query
    /// or fragment. Trailing slashes are dropped so blob URLs never contain
    /// `//`.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let url = Url::parse(trimmed)
            .map_err(|e| AggregatorError::InvalidEndpoint(format!("{}: {}", trimmed, e)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(AggregatorError::InvalidEndpoint(format!(
                "{}: unsupported scheme {}",
                trimmed,
                url.scheme()
            )));
        }
        if url.host_str().is_none() {
            return Err(AggregatorError::InvalidEndpoint(format!(
                "{}: missing host",
                trimmed
            )));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(AggregatorError::InvalidEndpoint(format!(
                "{}: query and fragment are not allowed",
                trimmed
            )));
        }

        Ok(Self {
            base: trimmed.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    /// URL serving `blob_id` from this aggregator. The ID is inserted as-is.
    pub fn blob_url(&self, blob_id: &str) -> String {
        format!("{}/{}", self.blobs_url(), blob_id)
    }

    /// Collection URL blobs are uploaded to on a publisher
    pub fn blobs_url(&self) -> String {
        format!("{}/{}", self.base, BLOBS_PATH)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base)
    }
}

/// Ordered endpoint list. Position is fallback priority.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointList {
    endpoints: Vec<Endpoint>,
}

impl EndpointList {
    pub fn new(endpoints: Vec<Endpoint>) -> Self {
        Self { endpoints }
    }

    /// The built-in aggregators of `network`
    pub fn aggregators_for(network: Network) -> Result<Self> {
        Self::from_urls(network.default_aggregators().iter().copied())
    }

    /// The built-in publishers of `network`
    pub fn publishers_for(network: Network) -> Result<Self> {
        Self::from_urls(network.default_publishers().iter().copied())
    }

    /// Parse a comma separated list of base URLs, skipping blank entries
    pub fn parse_list(list: &str) -> Result<Self> {
        Self::from_urls(list.split(',').filter(|s| !s.trim().is_empty()))
    }

    fn from_urls<'a>(urls: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        let endpoints = urls
            .into_iter()
            .map(Endpoint::parse)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { endpoints })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Endpoint> {
        self.endpoints.iter()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn base_urls(&self) -> Vec<String> {
        self.endpoints.iter().map(|e| e.base_url().to_string()).collect()
    }
}

impl<'a> IntoIterator for &'a EndpointList {
    type Item = &'a Endpoint;
    type IntoIter = std::slice::Iter<'a, Endpoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Link that opens `blob_id` through a proxy deployed at `app_base`
pub fn browser_url(app_base: &str, proxy_path: &str, blob_id: &str) -> Result<String> {
    let mut url = Url::parse(app_base)
        .and_then(|base| base.join(proxy_path))
        .map_err(|e| AggregatorError::InvalidEndpoint(format!("{}: {}", app_base, e)))?;
    url.query_pairs_mut().append_pair("blobId", blob_id);
    Ok(url.into())
}
