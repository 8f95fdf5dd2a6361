//! Managed inference service handle

use crate::error::Result;
use crate::openapi::{ControlPlane, CreateServiceRequest};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// A serving endpoint created from one model version
pub struct InferenceService {
    request: CreateServiceRequest,
    service_id: Option<String>,
    created_at: Option<DateTime<Utc>>,
    control_plane: Arc<dyn ControlPlane>,
}

impl std::fmt::Debug for InferenceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceService")
            .field("service_name", &self.request.service_name)
            .field("model_id", &self.request.model_id)
            .field("model_version", &self.request.model_version)
            .field("service_id", &self.service_id)
            .field("created_at", &self.created_at)
            .finish()
    }
}

impl InferenceService {
    pub fn new(request: CreateServiceRequest, control_plane: Arc<dyn ControlPlane>) -> Self {
        Self {
            request,
            service_id: None,
            created_at: None,
            control_plane,
        }
    }

    pub fn service_name(&self) -> &str {
        &self.request.service_name
    }

    /// Remote id, set once `create` succeeds
    pub fn service_id(&self) -> Option<&str> {
        self.service_id.as_deref()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn model_version(&self) -> u32 {
        self.request.model_version
    }

    pub fn request(&self) -> &CreateServiceRequest {
        &self.request
    }

    pub fn is_created(&self) -> bool {
        self.service_id.is_some()
    }

    /// Create the remote service; repeated calls return the existing id
    pub async fn create(&mut self) -> Result<&str> {
        if self.service_id.is_none() {
            let created = self.control_plane.create_service(&self.request).await?;

            tracing::info!(
                service = %self.request.service_name,
                service_id = %created.service_id,
                model_id = %self.request.model_id,
                model_version = self.request.model_version,
                replica = self.request.replica,
                "Inference service created"
            );

            self.created_at = Some(Utc::now());
            self.service_id = Some(created.service_id);
        }

        Ok(self.service_id.as_deref().unwrap_or_default())
    }
}
