//! In-process object store
//!
//! Follows the listing semantics of the HTTP service (marker is exclusive,
//! delimiter rolls keys up into common prefixes, `NextMarker` is set on
//! truncated pages) so sync code can be exercised without a network.

use super::{CommonPrefix, ListObjectsPage, ListObjectsRequest, ObjectStore, ObjectSummary};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tokio::sync::RwLock;

/// Bucket → (key → bytes) map behind a lock
#[derive(Default)]
pub struct MemoryObjectStore {
    buckets: RwLock<HashMap<String, BTreeMap<String, Vec<u8>>>>,
    list_requests: RwLock<Vec<ListObjectsRequest>>,
    downloads: RwLock<Vec<String>>,
    page_limit: Option<u32>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap page size below whatever the caller asks for
    pub fn with_page_limit(mut self, limit: u32) -> Self {
        self.page_limit = Some(limit.max(1));
        self
    }

    pub async fn put_object(&self, bucket: &str, key: &str, data: impl Into<Vec<u8>>) {
        let mut buckets = self.buckets.write().await;
        buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), data.into());
    }

    pub async fn get_object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        let buckets = self.buckets.read().await;
        buckets.get(bucket).and_then(|b| b.get(key)).cloned()
    }

    /// All keys in a bucket, sorted
    pub async fn keys(&self, bucket: &str) -> Vec<String> {
        let buckets = self.buckets.read().await;
        buckets
            .get(bucket)
            .map(|b| b.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Every listing request received so far
    pub async fn list_requests(&self) -> Vec<ListObjectsRequest> {
        self.list_requests.read().await.clone()
    }

    /// Keys fetched by `download_file`, in order
    pub async fn downloaded_keys(&self) -> Vec<String> {
        self.downloads.read().await.clone()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn list_objects(&self, request: &ListObjectsRequest) -> Result<ListObjectsPage> {
        self.list_requests.write().await.push(request.clone());

        let buckets = self.buckets.read().await;
        let bucket = buckets
            .get(&request.bucket)
            .ok_or_else(|| Error::NotFound(format!("bucket {}", request.bucket)))?;

        let max_keys = match self.page_limit {
            Some(limit) => request.max_keys.min(limit),
            None => request.max_keys,
        } as usize;

        let mut page = ListObjectsPage::default();
        let mut last_entry: Option<String> = None;
        let mut emitted = 0usize;

        let candidates = bucket.keys().filter(|key| {
            key.starts_with(&request.prefix)
                && (request.marker.is_empty() || key.as_str() > request.marker.as_str())
        });

        for key in candidates {
            let rest = &key[request.prefix.len()..];
            let rolled_up = if request.delimiter.is_empty() {
                None
            } else {
                rest.find(&request.delimiter).map(|idx| {
                    format!(
                        "{}{}",
                        request.prefix,
                        &rest[..idx + request.delimiter.len()]
                    )
                })
            };

            // Keys already covered by the last emitted prefix, or by the marker
            if let Some(prefix) = &rolled_up {
                if last_entry.as_deref() == Some(prefix.as_str())
                    || prefix.as_str() <= request.marker.as_str()
                {
                    continue;
                }
            }

            if emitted == max_keys {
                page.is_truncated = true;
                break;
            }

            match rolled_up {
                Some(prefix) => {
                    page.common_prefixes.push(CommonPrefix {
                        prefix: prefix.clone(),
                    });
                    last_entry = Some(prefix);
                }
                None => {
                    page.contents.push(ObjectSummary {
                        key: key.clone(),
                        size: bucket.get(key).map(|data| data.len() as u64),
                    });
                    last_entry = Some(key.clone());
                }
            }
            emitted += 1;
        }

        if page.is_truncated && !request.delimiter.is_empty() {
            page.next_marker = last_entry;
        }

        Ok(page)
    }

    async fn upload_file(&self, local_path: &Path, bucket: &str, key: &str) -> Result<u64> {
        let data = tokio::fs::read(local_path).await?;
        let size = data.len() as u64;
        self.put_object(bucket, key, data).await;
        Ok(size)
    }

    async fn download_file(&self, bucket: &str, key: &str, local_path: &Path) -> Result<u64> {
        let data = self
            .get_object(bucket, key)
            .await
            .ok_or_else(|| Error::NotFound(format!("object {}/{}", bucket, key)))?;

        tokio::fs::write(local_path, &data).await?;
        self.downloads.write().await.push(key.to_string());
        Ok(data.len() as u64)
    }
}
