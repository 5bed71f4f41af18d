//! Walrus Aggregator Client
//!
//! Fetches blobs from an ordered list of Walrus aggregators, falling back to
//! the next aggregator whenever one answers with an error or cannot be reached.
//! Uploads go through publishers with the same fallback rules.

pub mod endpoint;
pub mod error;
pub mod fetcher;
pub mod publisher;
pub mod types;

pub use endpoint::{browser_url, Endpoint, EndpointList, Network};
pub use error::{AggregatorError, Result};
pub use fetcher::{BlobFetcher, FetchFailure, FetchOutcome, FetchedBlob, FetcherOptions};
pub use publisher::{BlobPublisher, PublisherOptions, StoredBlob};
pub use types::{AlreadyCertified, BlobObject, NewlyCreated, WalrusBlobResponse};
