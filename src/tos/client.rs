//! HTTP object-storage client (path-style addressing)

use super::{ListObjectsPage, ListObjectsRequest, ObjectStore};
use crate::auth::{CredentialSigner, RequestSigner};
use crate::config::SdkConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use futures::StreamExt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Object-storage client for a single regional endpoint
pub struct TosClient {
    http: reqwest::Client,
    endpoint: String,
    signer: Arc<dyn RequestSigner>,
}

impl TosClient {
    /// Build a client from explicit configuration
    pub fn new(config: &SdkConfig) -> Result<Self> {
        let endpoint = config.resolve_tos_endpoint().ok_or_else(|| {
            Error::invalid(format!(
                "no object-storage endpoint for region '{}'",
                config.credential.region
            ))
        })?;

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            http: builder.build()?,
            endpoint,
            signer: Arc::new(CredentialSigner::new(config.credential.clone())),
        })
    }

    pub fn with_signer(endpoint: impl Into<String>, signer: Arc<dyn RequestSigner>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            signer,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn bucket_url(&self, bucket: &str) -> String {
        format!(
            "{}/{}",
            self.endpoint.trim_end_matches('/'),
            urlencoding::encode(bucket)
        )
    }

    fn object_url(&self, bucket: &str, key: &str) -> String {
        let encoded: Vec<_> = key.split('/').map(urlencoding::encode).collect();
        format!("{}/{}", self.bucket_url(bucket), encoded.join("/"))
    }
}

/// Turn a non-success response into a tagged error
async fn check_status(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = format!("{}: {}", what, body.chars().take(256).collect::<String>());
    if status == reqwest::StatusCode::NOT_FOUND {
        Err(Error::NotFound(message))
    } else {
        Err(Error::rejected(format!("HTTP{}", status.as_u16()), message))
    }
}

#[async_trait]
impl ObjectStore for TosClient {
    async fn list_objects(&self, request: &ListObjectsRequest) -> Result<ListObjectsPage> {
        let max_keys = request.max_keys.to_string();
        let query = [
            ("prefix", request.prefix.as_str()),
            ("delimiter", request.delimiter.as_str()),
            ("marker", request.marker.as_str()),
            ("max-keys", max_keys.as_str()),
        ];

        let response = self
            .signer
            .sign(self.http.get(self.bucket_url(&request.bucket)).query(&query))
            .send()
            .await?;
        let response = check_status(response, &format!("list {}", request.bucket)).await?;

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn upload_file(&self, local_path: &Path, bucket: &str, key: &str) -> Result<u64> {
        let file = fs::File::open(local_path).await?;
        let size = file.metadata().await?.len();

        let response = self
            .signer
            .sign(
                self.http
                    .put(self.object_url(bucket, key))
                    .header(reqwest::header::CONTENT_LENGTH, size)
                    .body(reqwest::Body::from(file)),
            )
            .send()
            .await?;
        check_status(response, &format!("put {}/{}", bucket, key)).await?;

        tracing::debug!(bucket = %bucket, key = %key, bytes = size, "Object uploaded");
        Ok(size)
    }

    async fn download_file(&self, bucket: &str, key: &str, local_path: &Path) -> Result<u64> {
        let response = self
            .signer
            .sign(self.http.get(self.object_url(bucket, key)))
            .send()
            .await?;
        let response = check_status(response, &format!("get {}/{}", bucket, key)).await?;

        // Write to a sibling temp file, then rename into place
        let mut temp_name = local_path.as_os_str().to_owned();
        temp_name.push(".part");
        let temp_path = std::path::PathBuf::from(temp_name);

        let mut file = fs::File::create(&temp_path).await?;
        let mut written = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, local_path).await?;

        tracing::debug!(bucket = %bucket, key = %key, bytes = written, "Object downloaded");
        Ok(written)
    }
}
