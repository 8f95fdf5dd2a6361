//! Control-plane request and response models

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Response wrapper shared by every action
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Envelope<T> {
    #[serde(default)]
    pub response_metadata: ResponseMetadata,
    pub result: Option<T>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResponseMetadata {
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub error: Option<ApiErrorInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiErrorInfo {
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// One version of a registered model
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ModelVersionInfo {
    pub model_version: u32,
    #[serde(rename = "ModelVersionID")]
    pub model_version_id: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
}

/// Result of `GetModel`: the model and its latest version
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ModelInfo {
    #[serde(rename = "ModelID", default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    pub model_name: String,
    pub model_format: String,
    pub model_type: String,
    pub version_info: ModelVersionInfo,
}

/// Result of `ListModelVersions`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ModelVersionList {
    pub total: u64,
    #[serde(default)]
    pub list: Vec<ModelVersionInfo>,
}

/// Result of `GetModelNextVersion`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct NextVersion {
    pub model_version: u32,
}

/// Body of `CreateModel`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct CreateModelRequest {
    pub model_name: String,
    pub model_format: String,
    pub model_type: String,
    #[serde(rename = "ModelID", skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Result of `CreateModel`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct CreatedModel {
    #[serde(rename = "ModelID")]
    pub model_id: String,
    pub model_version: u32,
}

/// Result of `GetTOSUploadPath`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct UploadLocation {
    pub bucket: String,
    /// Always ends with `/`
    pub key_prefix: String,
}

/// Body of `CreateService`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct CreateServiceRequest {
    pub service_name: String,
    pub image_url: String,
    #[serde(rename = "FlavorID")]
    pub flavor_id: String,
    pub model_name: String,
    #[serde(rename = "ModelID")]
    pub model_id: String,
    #[serde(rename = "ModelVersionID")]
    pub model_version_id: String,
    pub model_version: u32,
    pub model_path: String,
    pub model_type: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub envs: HashMap<String, String>,
    pub replica: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Result of `CreateService`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct CreatedService {
    #[serde(rename = "ServiceID")]
    pub service_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_get_model_envelope() {
        let body = r#"{
            "ResponseMetadata": {"RequestId": "req-1", "Action": "GetModel", "Version": "2021-10-01"},
            "Result": {
                "ModelID": "m-123",
                "ModelName": "resnet",
                "ModelFormat": "onnx",
                "ModelType": "classification",
                "VersionInfo": {
                    "ModelVersion": 3,
                    "ModelVersionID": "mv-3",
                    "Path": "tos://bucket/from-sdk-repo/abc/resnet"
                }
            }
        }"#;
        let envelope: Envelope<ModelInfo> = serde_json::from_str(body).unwrap();
        assert!(envelope.response_metadata.error.is_none());
        let model = envelope.result.unwrap();
        assert_eq!(model.model_id.as_deref(), Some("m-123"));
        assert_eq!(model.version_info.model_version, 3);
        assert_eq!(model.version_info.model_version_id, "mv-3");
    }

    #[test]
    fn test_parse_error_envelope_without_result() {
        let body = r#"{
            "ResponseMetadata": {"RequestId": "req-2", "Error": {"Code": "ModelNotFound", "Message": "no such model"}}
        }"#;
        let envelope: Envelope<ModelInfo> = serde_json::from_str(body).unwrap();
        assert!(envelope.result.is_none());
        let error = envelope.response_metadata.error.unwrap();
        assert_eq!(error.code, "ModelNotFound");
        assert_eq!(error.message, "no such model");
    }

    #[test]
    fn test_create_model_request_field_names() {
        let request = CreateModelRequest {
            model_name: "m".to_string(),
            model_format: "onnx".to_string(),
            model_type: "classification".to_string(),
            model_id: None,
            path: "tos://b/p".to_string(),
            description: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["ModelName"], "m");
        assert_eq!(json["Path"], "tos://b/p");
        // New models omit the id
        assert!(json.get("ModelID").is_none());
        assert!(json.get("Description").is_none());
    }

    #[test]
    fn test_create_service_request_omits_empty_envs() {
        let request = CreateServiceRequest {
            service_name: "model-m-deployed-by-sdk".to_string(),
            image_url: "registry/image:1".to_string(),
            flavor_id: "ml.g1".to_string(),
            model_name: "m".to_string(),
            model_id: "m-1".to_string(),
            model_version_id: "mv-1".to_string(),
            model_version: 1,
            model_path: "tos://b/p".to_string(),
            model_type: "classification".to_string(),
            envs: HashMap::new(),
            replica: 1,
            description: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["FlavorID"], "ml.g1");
        assert_eq!(json["ModelVersionID"], "mv-1");
        assert!(json.get("Envs").is_none());
    }
}
