//! Walrus publisher response types

use serde::{Deserialize, Serialize};

/// Response of `PUT /v1/blobs` on a publisher.
///
/// Exactly one of the two fields is set by a well-behaved publisher.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalrusBlobResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub newly_created: Option<NewlyCreated>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub already_certified: Option<AlreadyCertified>,
}

impl WalrusBlobResponse {
    /// ID under which the uploaded blob can be read back
    pub fn blob_id(&self) -> Option<&str> {
        if let Some(created) = &self.newly_created {
            return Some(&created.blob_object.blob_id);
        }
        self.already_certified
            .as_ref()
            .map(|certified| certified.blob_id.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewlyCreated {
    pub blob_object: BlobObject,
    #[serde(default)]
    pub resource_operation: Option<ResourceOperation>,
    #[serde(default)]
    pub cost: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobObject {
    pub id: String,
    #[serde(default)]
    pub registered_epoch: u64,
    pub blob_id: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub encoding_type: String,
    #[serde(default)]
    pub certified_epoch: Option<u64>,
    #[serde(default)]
    pub storage: Option<BlobStorage>,
    #[serde(default)]
    pub deletable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobStorage {
    pub id: String,
    pub start_epoch: u64,
    pub end_epoch: u64,
    pub storage_size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceOperation {
    #[serde(default)]
    pub register_from_scratch: Option<RegisterFromScratch>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterFromScratch {
    pub encoded_length: u64,
    pub epochs_ahead: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlreadyCertified {
    pub blob_id: String,
    #[serde(default)]
    pub event: Option<CertifiedEvent>,
    #[serde(default)]
    pub end_epoch: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertifiedEvent {
    pub tx_digest: String,
    pub event_seq: String,
}
