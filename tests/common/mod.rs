//! Shared fixtures for SDK integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use mlplatform_sdk::error::{Error, Result};
use mlplatform_sdk::openapi::{
    ControlPlane, CreateModelRequest, CreateServiceRequest, CreatedModel, CreatedService,
    ModelInfo, ModelVersionInfo, ModelVersionList, UploadLocation,
};
use std::collections::BTreeMap;
use std::sync::Mutex;

pub const UPLOAD_BUCKET: &str = "ml-platform-artifacts";

#[derive(Debug, Clone)]
struct RegisteredModel {
    name: String,
    format: String,
    model_type: String,
    versions: Vec<ModelVersionInfo>,
}

#[derive(Default)]
struct Inner {
    calls: Vec<String>,
    models: BTreeMap<String, RegisteredModel>,
    services: Vec<CreateServiceRequest>,
    next_model: u32,
    next_upload: u32,
    failing_service_creations: usize,
}

/// In-memory registry that records every action it receives
#[derive(Default)]
pub struct FakeControlPlane {
    inner: Mutex<Inner>,
}

impl FakeControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    /// Action names in call order
    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self, action: &str) -> usize {
        self.calls().iter().filter(|c| *c == action).count()
    }

    pub fn services(&self) -> Vec<CreateServiceRequest> {
        self.inner.lock().unwrap().services.clone()
    }

    pub fn version_numbers(&self, model_id: &str) -> Vec<u32> {
        self.inner
            .lock()
            .unwrap()
            .models
            .get(model_id)
            .map(|m| m.versions.iter().map(|v| v.model_version).collect())
            .unwrap_or_default()
    }

    /// Make the next `count` CreateService calls fail
    pub fn fail_service_creations(&self, count: usize) {
        self.inner.lock().unwrap().failing_service_creations = count;
    }

    pub fn has_model(&self, model_id: &str) -> bool {
        self.inner.lock().unwrap().models.contains_key(model_id)
    }

    /// Seed a model whose versions point at `paths`, numbered from 1
    pub fn seed_model(&self, model_id: &str, name: &str, paths: &[&str]) {
        let versions = paths
            .iter()
            .enumerate()
            .map(|(i, path)| version_info(model_id, name, i as u32 + 1, path))
            .collect();
        self.inner.lock().unwrap().models.insert(
            model_id.to_string(),
            RegisteredModel {
                name: name.to_string(),
                format: "onnx".to_string(),
                model_type: "classification".to_string(),
                versions,
            },
        );
    }

    fn record(&self, action: &str) {
        self.inner.lock().unwrap().calls.push(action.to_string());
    }
}

fn version_info(model_id: &str, name: &str, version: u32, path: &str) -> ModelVersionInfo {
    ModelVersionInfo {
        model_version: version,
        model_version_id: format!("{}-v{}", model_id, version),
        path: path.to_string(),
        model_name: Some(name.to_string()),
        model_format: Some("onnx".to_string()),
        model_type: Some("classification".to_string()),
        description: None,
        create_time: Some("2021-11-01T00:00:00Z".to_string()),
    }
}

fn not_found(model_id: &str) -> Error {
    Error::NotFound(format!("ModelNotFound: {}", model_id))
}

#[async_trait]
impl ControlPlane for FakeControlPlane {
    async fn get_model(&self, model_id: &str) -> Result<ModelInfo> {
        self.record("GetModel");
        let inner = self.inner.lock().unwrap();
        let model = inner.models.get(model_id).ok_or_else(|| not_found(model_id))?;
        let latest = model.versions.last().cloned().ok_or_else(|| not_found(model_id))?;
        Ok(ModelInfo {
            model_id: Some(model_id.to_string()),
            model_name: model.name.clone(),
            model_format: model.format.clone(),
            model_type: model.model_type.clone(),
            version_info: latest,
        })
    }

    async fn list_model_versions(
        &self,
        model_id: &str,
        model_version: Option<u32>,
        page_size: Option<u32>,
    ) -> Result<ModelVersionList> {
        self.record("ListModelVersions");
        let inner = self.inner.lock().unwrap();
        let model = inner.models.get(model_id).ok_or_else(|| not_found(model_id))?;
        let list: Vec<_> = model
            .versions
            .iter()
            .filter(|v| model_version.is_none_or(|want| v.model_version == want))
            .take(page_size.unwrap_or(u32::MAX) as usize)
            .cloned()
            .collect();
        Ok(ModelVersionList {
            total: list.len() as u64,
            list,
        })
    }

    async fn get_model_next_version(&self, model_id: Option<&str>) -> Result<u32> {
        self.record("GetModelNextVersion");
        let inner = self.inner.lock().unwrap();
        match model_id {
            None => Ok(1),
            Some(id) => {
                let model = inner.models.get(id).ok_or_else(|| not_found(id))?;
                Ok(model.versions.last().map_or(1, |v| v.model_version + 1))
            }
        }
    }

    async fn create_model(&self, request: &CreateModelRequest) -> Result<CreatedModel> {
        self.record("CreateModel");
        let mut inner = self.inner.lock().unwrap();

        let model_id = match &request.model_id {
            Some(id) => id.clone(),
            None => {
                inner.next_model += 1;
                format!("m-{}", inner.next_model)
            }
        };
        let model = inner
            .models
            .entry(model_id.clone())
            .or_insert_with(|| RegisteredModel {
                name: request.model_name.clone(),
                format: request.model_format.clone(),
                model_type: request.model_type.clone(),
                versions: Vec::new(),
            });
        let version = model.versions.last().map_or(1, |v| v.model_version + 1);
        let mut info = version_info(&model_id, &model.name, version, &request.path);
        info.description = request.description.clone();
        model.versions.push(info);

        Ok(CreatedModel {
            model_id,
            model_version: version,
        })
    }

    async fn delete_model_version(&self, model_id: &str, model_version_id: &str) -> Result<()> {
        self.record("DeleteModelVersion");
        let mut inner = self.inner.lock().unwrap();
        let model = inner.models.get_mut(model_id).ok_or_else(|| not_found(model_id))?;
        let before = model.versions.len();
        model.versions.retain(|v| v.model_version_id != model_version_id);
        if model.versions.len() == before {
            return Err(Error::NotFound(model_version_id.to_string()));
        }
        Ok(())
    }

    async fn delete_model(&self, model_id: &str) -> Result<()> {
        self.record("DeleteModel");
        self.inner
            .lock()
            .unwrap()
            .models
            .remove(model_id)
            .map(|_| ())
            .ok_or_else(|| not_found(model_id))
    }

    async fn get_tos_upload_path(
        &self,
        service_name: &str,
        path: &[String],
    ) -> Result<UploadLocation> {
        self.record("GetTOSUploadPath");
        let mut inner = self.inner.lock().unwrap();
        inner.next_upload += 1;
        Ok(UploadLocation {
            bucket: UPLOAD_BUCKET.to_string(),
            key_prefix: format!("{}/{}/upload-{}/", service_name, path.join("/"), inner.next_upload),
        })
    }

    async fn create_service(&self, request: &CreateServiceRequest) -> Result<CreatedService> {
        self.record("CreateService");
        let mut inner = self.inner.lock().unwrap();
        if inner.failing_service_creations > 0 {
            inner.failing_service_creations -= 1;
            return Err(Error::rejected("ServiceQuotaExceeded", "no capacity for flavor"));
        }
        inner.services.push(request.clone());
        Ok(CreatedService {
            service_id: format!("s-{}", inner.services.len()),
        })
    }
}
