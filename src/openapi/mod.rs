//! Control-plane API: model registry and inference service actions

pub mod client;
pub mod types;

pub use client::ApiClient;
pub use types::{
    CreateModelRequest, CreateServiceRequest, CreatedModel, CreatedService, ModelInfo,
    ModelVersionInfo, ModelVersionList, UploadLocation,
};

use crate::error::Result;
use async_trait::async_trait;

/// Actions the SDK consumes from the control plane
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Model metadata plus its latest version
    async fn get_model(&self, model_id: &str) -> Result<ModelInfo>;

    /// Versions of a model, optionally filtered to one version
    async fn list_model_versions(
        &self,
        model_id: &str,
        model_version: Option<u32>,
        page_size: Option<u32>,
    ) -> Result<ModelVersionList>;

    /// Version number the next registration will receive
    ///
    /// Without a model id this is the first version of a new model.
    async fn get_model_next_version(&self, model_id: Option<&str>) -> Result<u32>;

    async fn create_model(&self, request: &CreateModelRequest) -> Result<CreatedModel>;

    async fn delete_model_version(&self, model_id: &str, model_version_id: &str) -> Result<()>;

    async fn delete_model(&self, model_id: &str) -> Result<()>;

    /// Bucket and key prefix reserved for an upload
    async fn get_tos_upload_path(&self, service_name: &str, path: &[String])
    -> Result<UploadLocation>;

    async fn create_service(&self, request: &CreateServiceRequest) -> Result<CreatedService>;
}
