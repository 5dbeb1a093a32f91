use serde::{Deserialize, Serialize};
use tkt_types::{ALLOWED_CONTENT_TYPES, MAX_UPLOAD_BYTES};

/// Tunables for the record repositories.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordsConfig {
    /// Largest accepted upload, in bytes.
    pub max_upload_bytes: u64,
    /// MIME types accepted for attachments (exact match).
    pub allowed_content_types: Vec<String>,
    /// When `true`, deleting a ticket also deletes its comments,
    /// attachment records and file payloads.
    pub cascade_delete: bool,
    /// Extra attempts after a version mismatch on stores with conditional
    /// writes. Ignored on plain stores.
    pub optimistic_retries: u32,
    /// Path prefix for attachment download URLs.
    pub download_url_prefix: String,
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: MAX_UPLOAD_BYTES,
            allowed_content_types: ALLOWED_CONTENT_TYPES.iter().map(|s| s.to_string()).collect(),
            cascade_delete: false,
            optimistic_retries: 5,
            download_url_prefix: "/api/download".into(),
        }
    }
}

impl RecordsConfig {
    /// Whether `content_type` may be uploaded.
    pub fn allows_content_type(&self, content_type: &str) -> bool {
        self.allowed_content_types.iter().any(|t| t == content_type)
    }
}
