//! Object storage: client contract, implementations and tree sync
//!
//! Provides functionality for:
//! - Listing a bucket one page at a time (`ObjectStore::list_objects`)
//! - Moving single objects between disk and a bucket
//! - Mirroring a local tree to a prefix and back (`sync`)

pub mod client;
pub mod memory;
pub mod path;
pub mod sync;

pub use client::TosClient;
pub use memory::MemoryObjectStore;
pub use path::RemotePath;
pub use sync::{DownloadSummary, UploadSummary, download_tree, upload_tree};

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Parameters of one listing page request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListObjectsRequest {
    pub bucket: String,
    pub prefix: String,
    pub delimiter: String,
    pub marker: String,
    pub max_keys: u32,
}

/// An object directly under the listed prefix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ObjectSummary {
    pub key: String,
    #[serde(default)]
    pub size: Option<u64>,
}

/// A child "directory" rolled up by the delimiter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CommonPrefix {
    pub prefix: String,
}

/// One page of a listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListObjectsPage {
    #[serde(default)]
    pub contents: Vec<ObjectSummary>,
    #[serde(default)]
    pub common_prefixes: Vec<CommonPrefix>,
    #[serde(default)]
    pub is_truncated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_marker: Option<String>,
}

/// Paginated list/get/put blob store
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn list_objects(&self, request: &ListObjectsRequest) -> Result<ListObjectsPage>;

    /// Upload a local file, returning the number of bytes sent
    async fn upload_file(&self, local_path: &Path, bucket: &str, key: &str) -> Result<u64>;

    /// Fetch an object to a local file, returning the number of bytes written
    async fn download_file(&self, bucket: &str, key: &str, local_path: &Path) -> Result<u64>;
}
