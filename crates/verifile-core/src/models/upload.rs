use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Request for a pre-authorized write target
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlRequest {
    #[validate(length(min = 3, max = 254))]
    pub email: String,
    #[validate(length(min = 1, max = 255))]
    pub file_name: String,
    #[validate(length(max = 255))]
    pub file_type: String,
    #[serde(default)]
    pub file_size: Option<u64>,
    /// Upload grant returned by a successful verification
    pub upload_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlResponse {
    pub upload_url: String,
    pub storage_key: String,
    /// Always `PUT`
    pub method: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmUploadRequest {
    #[validate(length(min = 1, max = 1024))]
    pub storage_key: String,
    pub upload_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmUploadResponse {
    pub file_name: String,
    pub file_size_bytes: u64,
    pub storage_key: String,
}
