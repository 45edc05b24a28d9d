use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct SignUploadRequest {
    pub filename: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SignUploadResponse {
    pub key: String,
    pub upload_url: String,
    pub expires_in_seconds: u64,
    pub max_upload_bytes: u64,
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub key: Option<String>,
    pub ttl: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct DownloadResponse {
    pub url: String,
    pub expires_in_seconds: u64,
}

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    pub keys: Option<Vec<String>>,
}

/// Batch deletion is best-effort; failures are reported, not fatal.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: usize,
    pub failed: Vec<String>,
}
