//! ML Platform SDK
//!
//! Client library for the ML platform control plane: register model artifacts,
//! download model versions from object storage and deploy them to managed
//! inference services.

pub mod auth;
pub mod config;
pub mod error;
pub mod inference;
pub mod metrics;
pub mod model;
pub mod openapi;
pub mod tos;

pub use config::{Credential, SdkConfig};
pub use error::{Error, ErrorKind, Result};
pub use inference::InferenceService;
pub use model::{DeployRequest, Model, ModelState, RegisterRequest};
pub use openapi::{ApiClient, ControlPlane};
pub use tos::{MemoryObjectStore, ObjectStore, RemotePath, TosClient};
