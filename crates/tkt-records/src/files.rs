//! File payload storage in the `files` namespace.

use std::sync::Arc;

use bytes::Bytes;
use tkt_store::{BlobMetadata, BlobStore};
use tkt_types::{FileKey, FileUpload};
use tracing::debug;

use crate::error::{RecordError, RecordResult};

/// Metadata key holding the payload's MIME type.
pub const META_CONTENT_TYPE: &str = "contentType";
/// Metadata key holding the filename as uploaded.
pub const META_ORIGINAL_NAME: &str = "originalName";

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";
const FALLBACK_FILENAME: &str = "download";

/// A payload ready to be served.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadedFile {
    pub data: Bytes,
    pub content_type: String,
    pub filename: String,
}

/// Raw payloads keyed by [`FileKey`], with content type and original name
/// kept in the store's metadata side-channel.
#[derive(Clone)]
pub struct FileStore {
    store: Arc<dyn BlobStore>,
}

impl FileStore {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }

    pub async fn put(&self, key: &FileKey, upload: &FileUpload) -> RecordResult<()> {
        let metadata = BlobMetadata::new()
            .with(META_CONTENT_TYPE, upload.content_type.as_str())
            .with(META_ORIGINAL_NAME, upload.filename.as_str());
        self.store
            .set(key.as_str(), upload.data.clone(), Some(metadata))
            .await?;
        debug!(file_key = %key, size = upload.size(), "payload stored");
        Ok(())
    }

    /// Fetch a payload. Missing metadata falls back to a generic content type
    /// and to the name encoded in the key.
    pub async fn fetch(&self, key: &FileKey) -> RecordResult<DownloadedFile> {
        let blob = self
            .store
            .get_with_metadata(key.as_str())
            .await?
            .ok_or_else(|| RecordError::not_found(format!("file {key}")))?;
        let content_type = blob
            .metadata
            .get(META_CONTENT_TYPE)
            .unwrap_or(FALLBACK_CONTENT_TYPE)
            .to_string();
        let filename = blob
            .metadata
            .get(META_ORIGINAL_NAME)
            .filter(|n| !n.is_empty())
            .or_else(|| key.original_name())
            .unwrap_or(FALLBACK_FILENAME)
            .to_string();
        Ok(DownloadedFile {
            data: blob.data,
            content_type,
            filename,
        })
    }

    pub async fn remove(&self, key: &FileKey) -> RecordResult<()> {
        self.store.delete(key.as_str()).await?;
        debug!(file_key = %key, "payload removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tkt_store::InMemoryBlobStore;

    fn files() -> (Arc<InMemoryBlobStore>, FileStore) {
        let store = Arc::new(InMemoryBlobStore::new("files"));
        (store.clone(), FileStore::new(store))
    }

    #[tokio::test]
    async fn put_then_fetch_uses_metadata() {
        let (_, files) = files();
        let key = FileKey::new("1/1700-abcdefghi-ledger.csv");
        files
            .put(&key, &FileUpload::new("Ledger Q1.csv", "text/csv", &b"a,b"[..]))
            .await
            .unwrap();

        let file = files.fetch(&key).await.unwrap();
        assert_eq!(file.data, Bytes::from_static(b"a,b"));
        assert_eq!(file.content_type, "text/csv");
        assert_eq!(file.filename, "Ledger Q1.csv");
    }

    #[tokio::test]
    async fn fetch_without_metadata_parses_key() {
        let (raw, files) = files();
        raw.set("4/1700-abcdefghi-scan-01.png", Bytes::from_static(b"png"), None)
            .await
            .unwrap();
        let file = files
            .fetch(&FileKey::new("4/1700-abcdefghi-scan-01.png"))
            .await
            .unwrap();
        assert_eq!(file.filename, "scan-01.png");
        assert_eq!(file.content_type, "application/octet-stream");
    }

    #[tokio::test]
    async fn fetch_with_unparseable_key_uses_generic_name() {
        let (raw, files) = files();
        raw.set("loose", Bytes::from_static(b"x"), None).await.unwrap();
        let file = files.fetch(&FileKey::new("loose")).await.unwrap();
        assert_eq!(file.filename, "download");
    }

    #[tokio::test]
    async fn fetch_missing_is_not_found() {
        let (_, files) = files();
        assert!(matches!(
            files.fetch(&FileKey::new("1/x")).await,
            Err(RecordError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn remove_then_fetch_is_not_found() {
        let (_, files) = files();
        let key = FileKey::new("1/1-a-b.txt");
        files
            .put(&key, &FileUpload::new("b.txt", "text/plain", &b"hi"[..]))
            .await
            .unwrap();
        files.remove(&key).await.unwrap();
        assert!(files.fetch(&key).await.is_err());
    }
}
