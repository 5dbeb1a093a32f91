use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::ids::{AttachmentId, FileKey, TicketId};
use crate::temporal::Timestamp;

/// Upload size ceiling: 100 MiB.
pub const MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;

/// MIME types accepted for attachments.
pub const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "text/csv",
    "text/plain",
    "image/png",
    "image/jpeg",
    "image/gif",
];

/// The final component of a client-supplied file name, with any `/` or `\`
/// separated directories dropped. `None` when nothing usable is left.
pub fn base_filename(name: &str) -> Option<&str> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();
    match base {
        "" | "." | ".." => None,
        base => Some(base),
    }
}

/// Metadata record for an uploaded file.
///
/// The payload itself lives in the `files` namespace under [`file_key`];
/// this record lives in the ticket's attachment collection.
///
/// [`file_key`]: Attachment::file_key
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: AttachmentId,
    pub ticket_id: TicketId,
    pub filename: String,
    pub size: u64,
    pub content_type: String,
    pub file_key: FileKey,
    pub url: String,
    #[serde(rename = "created_at")]
    pub created_at: Timestamp,
}

/// An incoming file: name, declared MIME type, and raw bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileUpload {
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
}

impl FileUpload {
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    /// Payload size in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}
