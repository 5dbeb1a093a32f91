//! The [`BlobStore`] and [`BlobBackend`] traits.
//!
//! A backend hands out one [`BlobStore`] per namespace. Record collections
//! and file payloads live in separate namespaces of the same backend.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::blob::{BlobMetadata, StoredBlob, Version};
use crate::error::{StoreError, StoreResult};

/// A namespaced key→bytes store.
///
/// Offers whole-value get/set/delete and full-namespace listing. Nothing
/// here is atomic across calls: a read followed by a write can interleave
/// with any other writer. Backends that can do better advertise it through
/// [`supports_conditional_writes`](BlobStore::supports_conditional_writes).
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Name of the namespace this handle reads and writes.
    fn namespace(&self) -> &str;

    /// Read a value and its metadata.
    ///
    /// Returns `Ok(None)` if the key does not exist.
    async fn get_with_metadata(&self, key: &str) -> StoreResult<Option<StoredBlob>>;

    /// Create or replace a value. `None` metadata clears any previous metadata.
    async fn set(&self, key: &str, data: Bytes, metadata: Option<BlobMetadata>) -> StoreResult<()>;

    /// Remove a key. Deleting an absent key succeeds.
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Every key in the namespace, sorted.
    async fn list(&self) -> StoreResult<Vec<String>>;

    /// Read a value without its metadata.
    async fn get(&self, key: &str) -> StoreResult<Option<Bytes>> {
        Ok(self.get_with_metadata(key).await?.map(|blob| blob.data))
    }

    /// Keys starting with `prefix`, sorted.
    async fn list_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let mut keys = self.list().await?;
        keys.retain(|k| k.starts_with(prefix));
        Ok(keys)
    }

    /// Whether [`get_versioned`](BlobStore::get_versioned) and
    /// [`set_if_version`](BlobStore::set_if_version) are available.
    fn supports_conditional_writes(&self) -> bool {
        false
    }

    /// Read a value together with its current version token.
    async fn get_versioned(&self, _key: &str) -> StoreResult<Option<(Bytes, Version)>> {
        Err(StoreError::Unsupported("get_versioned"))
    }

    /// Write `data` only if the key's version still equals `expected`
    /// (`None` = key must be absent). Returns `Ok(false)` on a mismatch,
    /// leaving the stored value untouched.
    async fn set_if_version(
        &self,
        _key: &str,
        _data: Bytes,
        _expected: Option<Version>,
    ) -> StoreResult<bool> {
        Err(StoreError::Unsupported("set_if_version"))
    }
}

/// Opens namespaced [`BlobStore`] handles.
#[async_trait]
pub trait BlobBackend: Send + Sync {
    /// Open (creating if needed) the namespace called `name`.
    ///
    /// Opening the same name twice yields handles onto the same data.
    async fn open(&self, name: &str) -> StoreResult<Arc<dyn BlobStore>>;

    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;
}

/// Validate a namespace name: non-empty, `[a-z0-9_-]` only.
pub fn validate_namespace(name: &str) -> StoreResult<()> {
    let ok = !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_');
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(format!("invalid namespace name: {name:?}")))
    }
}
