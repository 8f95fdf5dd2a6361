//! Configuration structures and loading logic

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Local-only sentinel written into dataset trees; never uploaded
pub const DATASET_LOCAL_METADATA_FILENAME: &str = "local_metadata.manifest";

pub const SERVICE_NAME: &str = "ml_platform";
pub const SERVICE_VERSION: &str = "2021-10-01";
pub const SERVICE_HOST: &str = "open.volcengineapi.com";

/// Object-storage endpoint for each supported region
const TOS_REGION_ENDPOINTS: &[(&str, &str)] = &[
    ("cn-qingdao", "http://tos-s3-cn-qingdao.volces.com"),
    ("cn-north-1", "http://tos-s3-cn-qingdao.volces.com"),
    ("cn-beijing", "http://tos-s3-cn-beijing.volces.com"),
];

/// Look up the object-storage endpoint for a region
pub fn tos_endpoint_for_region(region: &str) -> Option<&'static str> {
    TOS_REGION_ENDPOINTS
        .iter()
        .find(|(r, _)| *r == region)
        .map(|(_, endpoint)| *endpoint)
}

/// Access credential passed explicitly to every client
#[derive(Clone, Deserialize, Serialize, PartialEq, Default)]
pub struct Credential {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
}

impl Credential {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            region: region.into(),
            session_token: None,
        }
    }
}

// Never print the secret
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("region", &self.region)
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// SDK configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SdkConfig {
    pub credential: Credential,
    pub service_host: String,
    pub service_name: String,
    pub service_version: String,
    /// Use plain HTTP for the control plane (test deployments)
    pub insecure: bool,
    /// Overrides the region lookup for object storage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tos_endpoint: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub show_progress: bool,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            credential: Credential::default(),
            service_host: SERVICE_HOST.to_string(),
            service_name: SERVICE_NAME.to_string(),
            service_version: SERVICE_VERSION.to_string(),
            insecure: false,
            tos_endpoint: None,
            request_timeout_secs: None,
            show_progress: true,
        }
    }
}

impl SdkConfig {
    /// Load configuration from file with environment variable overrides
    ///
    /// Without an explicit path the default location is used when it exists.
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let path = path.or_else(|| default_config_path().filter(|p| p.exists()));

        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content).context("Failed to parse TOML config")?
        } else {
            Self::default()
        };

        // Environment variable overrides
        if let Ok(ak) = std::env::var("MLP_ACCESS_KEY_ID") {
            config.credential.access_key_id = ak;
        }
        if let Ok(sk) = std::env::var("MLP_SECRET_ACCESS_KEY") {
            config.credential.secret_access_key = sk;
        }
        if let Ok(token) = std::env::var("MLP_SESSION_TOKEN") {
            config.credential.session_token = Some(token);
        }
        if let Ok(region) = std::env::var("MLP_REGION") {
            config.credential.region = region;
        }
        if let Ok(host) = std::env::var("MLP_SERVICE_HOST") {
            config.service_host = host;
        }
        if let Ok(endpoint) = std::env::var("MLP_TOS_ENDPOINT") {
            config.tos_endpoint = Some(endpoint);
        }
        if let Ok(timeout) = std::env::var("MLP_REQUEST_TIMEOUT_SECS") {
            config.request_timeout_secs = Some(
                timeout
                    .parse()
                    .context("Invalid MLP_REQUEST_TIMEOUT_SECS value")?,
            );
        }

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.credential.access_key_id.is_empty() || self.credential.secret_access_key.is_empty()
        {
            anyhow::bail!("Credential access key id and secret access key are required");
        }
        if self.service_host.is_empty() {
            anyhow::bail!("Service host cannot be empty");
        }
        if self.service_host.contains('/') {
            anyhow::bail!(
                "Service host '{}' must be a bare host, not a URL",
                self.service_host
            );
        }
        if self.tos_endpoint.is_none() && tos_endpoint_for_region(&self.credential.region).is_none()
        {
            anyhow::bail!(
                "Unknown region '{}' and no tos_endpoint configured",
                self.credential.region
            );
        }
        if self.request_timeout_secs == Some(0) {
            anyhow::bail!("request_timeout_secs must be > 0");
        }
        Ok(())
    }

    /// Base URL of the control-plane API
    pub fn api_endpoint(&self) -> String {
        let scheme = if self.insecure { "http" } else { "https" };
        format!("{}://{}", scheme, self.service_host)
    }

    /// Object-storage endpoint, explicit override first then region table
    pub fn resolve_tos_endpoint(&self) -> Option<String> {
        self.tos_endpoint
            .clone()
            .or_else(|| tos_endpoint_for_region(&self.credential.region).map(str::to_string))
    }
}

/// `<config dir>/mlplatform/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("mlplatform").join("config.toml"))
}
