use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body of a successful `POST /api/upload-cv`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    pub success: bool,
    pub message: String,
    /// Absolute path the CV was stored at
    pub file_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Multipart form accepted by the upload endpoint
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadCvForm {
    /// PDF or DOCX file, under 10 MiB
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}
