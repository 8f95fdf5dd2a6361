//! HTTP implementation of the control-plane API

use super::ControlPlane;
use super::types::{
    ApiErrorInfo, CreateModelRequest, CreateServiceRequest, CreatedModel, CreatedService,
    Envelope, ModelInfo, ModelVersionList, NextVersion, UploadLocation,
};
use crate::auth::{CredentialSigner, RequestSigner};
use crate::config::SdkConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Control-plane client issuing `POST /?Action=..&Version=..` requests
pub struct ApiClient {
    http: reqwest::Client,
    endpoint: String,
    version: String,
    signer: Arc<dyn RequestSigner>,
}

impl ApiClient {
    /// Build a client from explicit configuration
    pub fn new(config: &SdkConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            http: builder.build()?,
            endpoint: config.api_endpoint(),
            version: config.service_version.clone(),
            signer: Arc::new(CredentialSigner::new(config.credential.clone())),
        })
    }

    /// Build a client against an arbitrary endpoint with a custom signer
    pub fn with_signer(
        endpoint: impl Into<String>,
        version: impl Into<String>,
        signer: Arc<dyn RequestSigner>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            version: version.into(),
            signer,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Issue an action and return its raw `Result` payload
    async fn send<B: Serialize + ?Sized>(
        &self,
        action: &'static str,
        body: &B,
    ) -> Result<Option<serde_json::Value>> {
        let url = format!("{}/", self.endpoint.trim_end_matches('/'));
        let request = self
            .http
            .post(&url)
            .query(&[("Action", action), ("Version", self.version.as_str())])
            .json(body);

        tracing::debug!(action = %action, "Calling control plane");

        let result = self.send_signed(request).await;
        crate::metrics::record_api_call(action, result.is_ok());

        if let Err(e) = &result {
            tracing::debug!(action = %action, error = %e, "Control plane call failed");
        }
        result
    }

    async fn send_signed(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<Option<serde_json::Value>> {
        let response = self.signer.sign(request).send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        let envelope: Envelope<serde_json::Value> = match serde_json::from_slice(&bytes) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => return Err(status_error(status, &bytes)),
            Err(e) => return Err(e.into()),
        };

        if let Some(error) = envelope.response_metadata.error {
            return Err(api_error(status, error));
        }
        if !status.is_success() {
            return Err(status_error(status, &bytes));
        }

        Ok(envelope.result)
    }

    /// Issue an action whose `Result` must decode into `T`
    async fn call<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        action: &'static str,
        body: &B,
    ) -> Result<T> {
        let result = self
            .send(action, body)
            .await?
            .ok_or_else(|| Error::rejected("EmptyResult", format!("{} returned no result", action)))?;
        Ok(serde_json::from_value(result)?)
    }
}

fn api_error(status: reqwest::StatusCode, error: ApiErrorInfo) -> Error {
    if status == reqwest::StatusCode::NOT_FOUND || error.code.contains("NotFound") {
        Error::NotFound(format!("{}: {}", error.code, error.message))
    } else {
        Error::rejected(error.code, error.message)
    }
}

fn status_error(status: reqwest::StatusCode, body: &[u8]) -> Error {
    let message = String::from_utf8_lossy(body).chars().take(256).collect::<String>();
    if status == reqwest::StatusCode::NOT_FOUND {
        Error::NotFound(message)
    } else {
        Error::rejected(format!("HTTP{}", status.as_u16()), message)
    }
}

#[async_trait]
impl ControlPlane for ApiClient {
    async fn get_model(&self, model_id: &str) -> Result<ModelInfo> {
        self.call("GetModel", &json!({ "ModelID": model_id })).await
    }

    async fn list_model_versions(
        &self,
        model_id: &str,
        model_version: Option<u32>,
        page_size: Option<u32>,
    ) -> Result<ModelVersionList> {
        let mut body = json!({ "ModelID": model_id });
        if let Some(version) = model_version {
            body["ModelVersion"] = json!(version);
        }
        if let Some(size) = page_size {
            body["PageSize"] = json!(size);
        }
        self.call("ListModelVersions", &body).await
    }

    async fn get_model_next_version(&self, model_id: Option<&str>) -> Result<u32> {
        let body = match model_id {
            Some(id) => json!({ "ModelID": id }),
            None => json!({}),
        };
        let next: NextVersion = self.call("GetModelNextVersion", &body).await?;
        Ok(next.model_version)
    }

    async fn create_model(&self, request: &CreateModelRequest) -> Result<CreatedModel> {
        self.call("CreateModel", request).await
    }

    async fn delete_model_version(&self, model_id: &str, model_version_id: &str) -> Result<()> {
        self.send(
            "DeleteModelVersion",
            &json!({ "ModelID": model_id, "ModelVersionID": model_version_id }),
        )
        .await?;
        Ok(())
    }

    async fn delete_model(&self, model_id: &str) -> Result<()> {
        self.send("DeleteModel", &json!({ "ModelID": model_id })).await?;
        Ok(())
    }

    async fn get_tos_upload_path(
        &self,
        service_name: &str,
        path: &[String],
    ) -> Result<UploadLocation> {
        self.call(
            "GetTOSUploadPath",
            &json!({ "ServiceName": service_name, "Path": path }),
        )
        .await
    }

    async fn create_service(&self, request: &CreateServiceRequest) -> Result<CreatedService> {
        self.call("CreateService", request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_mapping() {
        let not_found = api_error(
            reqwest::StatusCode::OK,
            ApiErrorInfo {
                code: "ModelNotFound".to_string(),
                message: "gone".to_string(),
            },
        );
        assert!(matches!(not_found, Error::NotFound(_)));

        let rejected = api_error(
            reqwest::StatusCode::BAD_REQUEST,
            ApiErrorInfo {
                code: "InvalidParameter".to_string(),
                message: "bad name".to_string(),
            },
        );
        match rejected {
            Error::Rejected { code, message } => {
                assert_eq!(code, "InvalidParameter");
                assert_eq!(message, "bad name");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_status_error_truncates_body() {
        let body = "x".repeat(1000);
        match status_error(reqwest::StatusCode::BAD_GATEWAY, body.as_bytes()) {
            Error::Rejected { code, message } => {
                assert_eq!(code, "HTTP502");
                assert_eq!(message.len(), 256);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(matches!(
            status_error(reqwest::StatusCode::NOT_FOUND, b""),
            Error::NotFound(_)
        ));
    }

    #[test]
    fn test_client_from_config() {
        let config = SdkConfig {
            service_host: "api.example.com".to_string(),
            request_timeout_secs: Some(5),
            ..Default::default()
        };
        let client = ApiClient::new(&config).unwrap();
        assert_eq!(client.endpoint(), "https://api.example.com");
    }
}
