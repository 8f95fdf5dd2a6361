//! Model handle: registry identity, artifact transfer and deployment
//!
//! The handle's state is derived from which identity fields are set:
//!
//! ```text
//! Unbound ──register──▶ Registered ──sync──▶ Synced
//!    ▲                      ▲                  │
//!    └─unregister_all───────┴───unregister─────┘
//! ```
//!
//! Validation failures are returned as `InvalidArgument` before any network
//! I/O. Remote failures are logged with the operation name and returned as
//! [`Error::Operation`], which keeps the underlying cause and its kind.

use crate::config::SdkConfig;
use crate::error::{Error, Result};
use crate::inference::InferenceService;
use crate::openapi::{
    ApiClient, ControlPlane, CreateModelRequest, CreateServiceRequest, CreatedModel,
    ModelVersionInfo,
};
use crate::tos::{ObjectStore, RemotePath, TosClient, download_tree, upload_tree};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tabled::{Table, Tabled, settings::Style};

/// Upload location requested for new artifacts
const UPLOAD_SERVICE_NAME: &str = "dataset";
const UPLOAD_PATH: &str = "from-sdk-repo";
/// Versions shown by `explain`
const EXPLAIN_PAGE_SIZE: u32 = 20;

/// Lifecycle state derived from the handle's identity fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    /// No registry identity
    Unbound,
    /// Model id known, version not resolved
    Registered,
    /// Model id, version and remote path resolved
    Synced,
}

impl std::fmt::Display for ModelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unbound => write!(f, "unbound"),
            Self::Registered => write!(f, "registered"),
            Self::Synced => write!(f, "synced"),
        }
    }
}

/// Arguments for [`Model::register`]
#[derive(Debug, Clone, Default)]
pub struct RegisterRequest {
    pub model_name: Option<String>,
    pub model_format: Option<String>,
    pub model_type: Option<String>,
    pub description: Option<String>,
}

impl RegisterRequest {
    /// Arguments for registering a brand-new model
    pub fn new_model(
        model_name: impl Into<String>,
        model_format: impl Into<String>,
        model_type: impl Into<String>,
    ) -> Self {
        Self {
            model_name: Some(model_name.into()),
            model_format: Some(model_format.into()),
            model_type: Some(model_type.into()),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Arguments for [`Model::deploy`]
#[derive(Debug, Clone)]
pub struct DeployRequest {
    pub image_url: String,
    pub flavor_id: String,
    /// Replace a deployment this handle already tracks for the version
    pub force: bool,
    pub model_version: Option<u32>,
    pub envs: HashMap<String, String>,
    pub replica: u32,
    pub description: Option<String>,
}

impl DeployRequest {
    pub fn new(image_url: impl Into<String>, flavor_id: impl Into<String>) -> Self {
        Self {
            image_url: image_url.into(),
            flavor_id: flavor_id.into(),
            force: false,
            model_version: None,
            envs: HashMap::new(),
            replica: 1,
            description: None,
        }
    }
}

/// Outcome of a successful upload + create
struct Registration {
    created: CreatedModel,
    remote_path: String,
    model_name: String,
    model_format: String,
    model_type: String,
}

/// In-memory handle for one registry entry
///
/// Not synchronized: callers sharing a handle across tasks must serialize
/// access themselves.
pub struct Model {
    model_id: Option<String>,
    model_version: Option<u32>,
    model_version_id: Option<String>,
    model_name: Option<String>,
    model_format: Option<String>,
    model_type: Option<String>,
    local_path: Option<PathBuf>,
    remote_path: Option<String>,
    inference_services: HashMap<u32, InferenceService>,
    control_plane: Arc<dyn ControlPlane>,
    object_store: Arc<dyn ObjectStore>,
    show_progress: bool,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("model_id", &self.model_id)
            .field("model_version", &self.model_version)
            .field("model_version_id", &self.model_version_id)
            .field("model_name", &self.model_name)
            .field("local_path", &self.local_path)
            .field("remote_path", &self.remote_path)
            .field("deployments", &self.inference_services.len())
            .finish()
    }
}

/// Log a remote failure at an operation boundary and tag it
fn operation_failed(operation: &'static str, error: Error) -> Error {
    if !matches!(error, Error::InvalidArgument(_)) {
        tracing::warn!(operation = operation, error = %error, "Model operation failed");
        crate::metrics::record_operation_failure(operation);
    }
    error.in_operation(operation)
}

impl Model {
    /// Create a handle with explicit collaborators
    ///
    /// At least one of `model_id` and `local_path` is required.
    pub fn new(
        model_id: Option<String>,
        local_path: Option<PathBuf>,
        control_plane: Arc<dyn ControlPlane>,
        object_store: Arc<dyn ObjectStore>,
    ) -> Result<Self> {
        if model_id.is_none() && local_path.is_none() {
            tracing::warn!("Model needs a model_id or a local_path");
            return Err(Error::invalid("model needs a model_id or a local_path"));
        }

        Ok(Self {
            model_id,
            model_version: None,
            model_version_id: None,
            model_name: None,
            model_format: None,
            model_type: None,
            local_path,
            remote_path: None,
            inference_services: HashMap::new(),
            control_plane,
            object_store,
            show_progress: false,
        })
    }

    /// Create a handle backed by HTTP clients built from `config`
    pub fn from_config(
        config: &SdkConfig,
        model_id: Option<String>,
        local_path: Option<PathBuf>,
    ) -> Result<Self> {
        let control_plane = Arc::new(ApiClient::new(config)?);
        let object_store = Arc::new(TosClient::new(config)?);
        Ok(Self::new(model_id, local_path, control_plane, object_store)?
            .with_progress(config.show_progress))
    }

    /// Show transfer progress bars on stderr
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn model_id(&self) -> Option<&str> {
        self.model_id.as_deref()
    }

    pub fn model_version(&self) -> Option<u32> {
        self.model_version
    }

    pub fn model_version_id(&self) -> Option<&str> {
        self.model_version_id.as_deref()
    }

    pub fn model_name(&self) -> Option<&str> {
        self.model_name.as_deref()
    }

    pub fn model_format(&self) -> Option<&str> {
        self.model_format.as_deref()
    }

    pub fn model_type(&self) -> Option<&str> {
        self.model_type.as_deref()
    }

    pub fn local_path(&self) -> Option<&Path> {
        self.local_path.as_deref()
    }

    pub fn remote_path(&self) -> Option<&str> {
        self.remote_path.as_deref()
    }

    /// Deployment this handle tracks for a version
    pub fn inference_service(&self, model_version: u32) -> Option<&InferenceService> {
        self.inference_services.get(&model_version)
    }

    pub fn inference_services(&self) -> impl Iterator<Item = (&u32, &InferenceService)> {
        self.inference_services.iter()
    }

    pub fn state(&self) -> ModelState {
        match (&self.model_id, self.model_version, &self.remote_path) {
            (None, _, _) => ModelState::Unbound,
            (Some(_), Some(_), Some(_)) => ModelState::Synced,
            (Some(_), _, _) => ModelState::Registered,
        }
    }

    /// Forget version-scoped identity
    fn clear(&mut self) {
        self.model_version = None;
        self.model_version_id = None;
        self.remote_path = None;
    }

    /// Return to the unbound state
    fn restore(&mut self) {
        self.clear();
        self.model_id = None;
    }

    fn require_model_id(&self, operation: &str) -> Result<String> {
        self.model_id.clone().ok_or_else(|| {
            tracing::warn!(operation = operation, "Model has not been registered");
            Error::invalid(format!("{}: model_id is empty", operation))
        })
    }

    /// Switch to `model_version`, dropping identity resolved for another one
    pub fn select_version(&mut self, model_version: Option<u32>) {
        if let Some(version) = model_version
            && self.model_version != Some(version)
        {
            self.clear();
            self.model_version = Some(version);
        }
    }

    /// Refresh version identity from the registry
    ///
    /// Without a selected version the model's latest version is used,
    /// otherwise that exact version must exist.
    pub async fn sync(&mut self) -> Result<()> {
        let model_id = self.require_model_id("sync")?;

        let (info, name, format, model_type) = match self.model_version {
            None => {
                let model = self.control_plane.get_model(&model_id).await?;
                (
                    model.version_info,
                    Some(model.model_name),
                    Some(model.model_format),
                    Some(model.model_type),
                )
            }
            Some(version) => {
                let versions = self
                    .control_plane
                    .list_model_versions(&model_id, Some(version), None)
                    .await?;
                let info = versions
                    .list
                    .into_iter()
                    .find(|v| v.model_version == version)
                    .filter(|_| versions.total > 0)
                    .ok_or_else(|| {
                        tracing::warn!(model_id = %model_id, version = version, "Selected model version does not exist");
                        Error::NotFound(format!("model {} version {}", model_id, version))
                    })?;
                let (name, format, model_type) =
                    (info.model_name.clone(), info.model_format.clone(), info.model_type.clone());
                (info, name, format, model_type)
            }
        };

        self.model_version = Some(info.model_version);
        self.model_version_id = Some(info.model_version_id);
        self.remote_path = Some(info.path);
        if name.is_some() {
            self.model_name = name;
        }
        if format.is_some() {
            self.model_format = format;
        }
        if model_type.is_some() {
            self.model_type = model_type;
        }

        tracing::debug!(
            model_id = %model_id,
            version = ?self.model_version,
            remote_path = ?self.remote_path,
            "Model synced with registry"
        );
        Ok(())
    }

    /// Register the artifact at `local_path` as a new model or a new version
    pub async fn register(&mut self, request: RegisterRequest) -> Result<()> {
        let local_path = match &self.local_path {
            Some(path) => path.clone(),
            None => {
                tracing::warn!("Model local_path is empty");
                return Err(Error::invalid("register: local_path is empty"));
            }
        };
        if !local_path.exists() {
            tracing::warn!(local_path = ?local_path, "Model local_path does not exist");
            return Err(Error::invalid(format!(
                "register: local_path {:?} does not exist",
                local_path
            )));
        }

        let new_model = match (
            &self.model_id,
            &request.model_name,
            &request.model_format,
            &request.model_type,
        ) {
            (Some(_), _, _, _) => None,
            (None, Some(name), Some(format), Some(model_type)) => {
                Some((name.clone(), format.clone(), model_type.clone()))
            }
            (None, _, _, _) => {
                tracing::warn!("Registering a new model needs model_name, model_format and model_type");
                return Err(Error::invalid(
                    "register: new model needs model_name, model_format and model_type",
                ));
            }
        };

        let registration = self
            .register_remote(&local_path, new_model, &request)
            .await
            .map_err(|e| operation_failed("register", e))?;

        // Committed only once upload and create both succeeded
        self.model_id = Some(registration.created.model_id);
        self.model_version = Some(registration.created.model_version);
        self.model_version_id = None;
        self.remote_path = Some(registration.remote_path);
        self.model_name = Some(registration.model_name);
        self.model_format = Some(registration.model_format);
        self.model_type = Some(registration.model_type);

        tracing::info!(
            model_id = ?self.model_id,
            version = ?self.model_version,
            remote_path = ?self.remote_path,
            "Model registered"
        );
        Ok(())
    }

    async fn register_remote(
        &self,
        local_path: &Path,
        new_model: Option<(String, String, String)>,
        request: &RegisterRequest,
    ) -> Result<Registration> {
        let (name, format, model_type) = match new_model {
            Some(fields) => {
                let next = self.control_plane.get_model_next_version(None).await?;
                tracing::debug!(next_version = next, "Registering new model");
                fields
            }
            None => {
                let model_id = self.require_model_id("register")?;
                let next = self
                    .control_plane
                    .get_model_next_version(Some(&model_id))
                    .await?;
                let existing = self.control_plane.get_model(&model_id).await?;
                tracing::debug!(model_id = %model_id, next_version = next, "Registering new version");

                if let Some(name) = &request.model_name
                    && *name != existing.model_name
                {
                    tracing::warn!(
                        requested = %name,
                        registered = %existing.model_name,
                        "Model name differs from the registry, keeping the registered name"
                    );
                }
                (
                    existing.model_name,
                    request.model_format.clone().unwrap_or(existing.model_format),
                    request.model_type.clone().unwrap_or(existing.model_type),
                )
            }
        };

        let location = self
            .control_plane
            .get_tos_upload_path(UPLOAD_SERVICE_NAME, &[UPLOAD_PATH.to_string()])
            .await?;
        let upload = upload_tree(
            self.object_store.as_ref(),
            local_path,
            &location.bucket,
            &location.key_prefix,
            self.show_progress,
        )
        .await?;
        let remote_path = upload.remote_path.to_string();

        let created = self
            .control_plane
            .create_model(&CreateModelRequest {
                model_name: name.clone(),
                model_format: format.clone(),
                model_type: model_type.clone(),
                model_id: self.model_id.clone(),
                path: remote_path.clone(),
                description: request.description.clone(),
            })
            .await?;

        Ok(Registration {
            created,
            remote_path,
            model_name: name,
            model_format: format,
            model_type,
        })
    }

    /// Download a version's artifact tree to `local_path`
    ///
    /// A `model_version` different from the current one drops the resolved
    /// identity so the remote location is looked up again.
    pub async fn download(
        &mut self,
        model_version: Option<u32>,
        local_path: Option<PathBuf>,
    ) -> Result<()> {
        self.require_model_id("download")?;

        if let Some(path) = local_path {
            self.local_path = Some(path);
        }
        self.select_version(model_version);

        let Some(dest) = self.local_path.clone() else {
            tracing::warn!("Model local_path is empty");
            return Err(Error::invalid("download: local_path is empty"));
        };

        self.download_remote(&dest)
            .await
            .map_err(|e| operation_failed("download", e))
    }

    async fn download_remote(&mut self, dest: &Path) -> Result<()> {
        if self.remote_path.is_none() || self.model_version.is_none() {
            tracing::info!("Model remote_path is empty, syncing");
            self.sync().await?;
        }

        let remote_path = self.remote_path.clone().unwrap_or_default();
        let remote = match RemotePath::parse(&remote_path) {
            Ok(remote) => remote,
            Err(e) => {
                tracing::warn!(remote_path = %remote_path, error = %e, "Unsupported remote_path, nothing downloaded");
                return Ok(());
            }
        };

        download_tree(self.object_store.as_ref(), &remote, dest, self.show_progress).await?;
        Ok(())
    }

    /// Delete the current version from the registry
    pub async fn unregister(&mut self) -> Result<()> {
        let Some(model_id) = self.model_id.clone() else {
            tracing::warn!("Model has not been registered");
            return Ok(());
        };

        self.unregister_remote(&model_id)
            .await
            .map_err(|e| operation_failed("unregister", e))?;

        tracing::info!(model_id = %model_id, version = ?self.model_version, "Model version unregistered");
        self.clear();
        Ok(())
    }

    async fn unregister_remote(&mut self, model_id: &str) -> Result<()> {
        self.sync().await?;
        let version_id = self
            .model_version_id
            .clone()
            .ok_or_else(|| Error::NotFound(format!("model {} has no resolved version", model_id)))?;
        self.control_plane
            .delete_model_version(model_id, &version_id)
            .await
    }

    /// Delete the model and every version from the registry
    pub async fn unregister_all_versions(&mut self) -> Result<()> {
        let Some(model_id) = self.model_id.clone() else {
            tracing::warn!("Model has not been registered");
            return Ok(());
        };

        self.control_plane
            .delete_model(&model_id)
            .await
            .map_err(|e| operation_failed("unregister_all_versions", e))?;

        tracing::info!(model_id = %model_id, "Model unregistered with all versions");
        self.restore();
        Ok(())
    }

    /// Render the first page of versions as a table and print it
    pub async fn explain(&self) -> Result<String> {
        let model_id = self.require_model_id("explain")?;

        let versions = self
            .control_plane
            .list_model_versions(&model_id, None, Some(EXPLAIN_PAGE_SIZE))
            .await
            .map_err(|e| operation_failed("explain", e))?;

        let table = render_versions(&versions.list);
        println!("{}", table);
        Ok(table)
    }

    /// Deploy a version to a managed inference service
    ///
    /// Without `force`, a deployment this handle already tracks for the
    /// resolved version is returned unchanged. With `force` a new service is
    /// created and the previous one is only forgotten locally; it keeps
    /// running remotely until the caller deletes it.
    pub async fn deploy(&mut self, request: DeployRequest) -> Result<&InferenceService> {
        let model_id = self.require_model_id("deploy")?;
        self.select_version(request.model_version);
        self.sync()
            .await
            .map_err(|e| operation_failed("deploy", e))?;

        let version = self
            .model_version
            .ok_or_else(|| Error::NotFound(format!("model {} has no version", model_id)))?;

        if !request.force && self.inference_services.contains_key(&version) {
            let service = self
                .inference_services
                .get_mut(&version)
                .ok_or_else(|| Error::NotFound(format!("deployment for version {}", version)))?;
            if service.is_created() {
                tracing::warn!(model_id = %model_id, version = version, "Model version already deployed");
            } else {
                // An earlier create failed; the request is kept so it can be retried
                tracing::info!(model_id = %model_id, version = version, "Retrying inference service creation");
                service
                    .create()
                    .await
                    .map_err(|e| operation_failed("deploy", e))?;
            }
            return Ok(&*service);
        }
        if let Some(previous) = self.inference_services.get(&version) {
            tracing::warn!(
                model_id = %model_id,
                version = version,
                previous_service_id = ?previous.service_id(),
                "Forced redeploy, previous inference service is left running"
            );
        }

        let model_name = self.model_name.clone().unwrap_or_default();
        let service_request = CreateServiceRequest {
            service_name: format!("model-{}-deployed-by-sdk", model_name),
            image_url: request.image_url,
            flavor_id: request.flavor_id,
            model_name,
            model_id,
            model_version_id: self.model_version_id.clone().unwrap_or_default(),
            model_version: version,
            model_path: self.remote_path.clone().unwrap_or_default(),
            model_type: self.model_type.clone().unwrap_or_default(),
            envs: request.envs,
            replica: request.replica,
            description: request.description,
        };
        let service = InferenceService::new(service_request, self.control_plane.clone());

        let service = match self.inference_services.entry(version) {
            Entry::Occupied(mut entry) => {
                entry.insert(service);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(service),
        };
        service
            .create()
            .await
            .map_err(|e| operation_failed("deploy", e))?;

        Ok(&*service)
    }
}

#[derive(Tabled)]
struct VersionRow {
    #[tabled(rename = "Version")]
    version: u32,
    #[tabled(rename = "Format")]
    format: String,
    #[tabled(rename = "Type")]
    model_type: String,
    #[tabled(rename = "RemotePath")]
    remote_path: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "CreateTime")]
    create_time: String,
}

/// Fixed-column version table
pub fn render_versions(versions: &[ModelVersionInfo]) -> String {
    let rows = versions.iter().map(|v| VersionRow {
        version: v.model_version,
        format: v.model_format.clone().unwrap_or_default(),
        model_type: v.model_type.clone().unwrap_or_default(),
        remote_path: v.path.clone(),
        description: v.description.clone().unwrap_or_default(),
        create_time: v.create_time.clone().unwrap_or_default(),
    });

    let mut table = Table::new(rows);
    table.with(Style::ascii());
    table.to_string()
}
