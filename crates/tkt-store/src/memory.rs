//! In-memory blob store for tests and embedding.
//!
//! [`InMemoryBlobStore`] keeps one namespace in a `HashMap` behind a
//! `RwLock`. [`InMemoryBackend`] hands out one shared store per namespace.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use bytes::Bytes;

use crate::blob::{BlobMetadata, StoredBlob, Version};
use crate::error::{StoreError, StoreResult};
use crate::traits::{validate_namespace, BlobBackend, BlobStore};

#[derive(Clone)]
struct Entry {
    data: Bytes,
    metadata: BlobMetadata,
    version: u64,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    // Monotonic across the namespace so a delete-then-recreate never
    // reuses a version another reader may still hold.
    next_version: u64,
}

/// An in-memory implementation of [`BlobStore`].
///
/// Supports conditional writes unless built with
/// [`without_conditional_writes`](Self::without_conditional_writes), which
/// mimics a plain last-writer-wins service.
pub struct InMemoryBlobStore {
    namespace: String,
    inner: RwLock<Inner>,
    conditional: bool,
}

impl InMemoryBlobStore {
    /// Create an empty store for `namespace`, with conditional writes.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            inner: RwLock::new(Inner::default()),
            conditional: true,
        }
    }

    /// Create an empty store that reports no conditional-write support.
    pub fn without_conditional_writes(namespace: impl Into<String>) -> Self {
        Self {
            conditional: false,
            ..Self::new(namespace)
        }
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.inner.read().map(|g| g.entries.len()).unwrap_or(0)
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_lock(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {e}")))
    }

    fn write_lock(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {e}")))
    }
}

fn check_key(key: &str) -> StoreResult<()> {
    if key.is_empty() {
        return Err(StoreError::InvalidKey("empty key".into()));
    }
    Ok(())
}

fn put(inner: &mut Inner, key: &str, data: Bytes, metadata: BlobMetadata) {
    inner.next_version += 1;
    let version = inner.next_version;
    inner.entries.insert(
        key.to_string(),
        Entry {
            data,
            metadata,
            version,
        },
    );
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn get_with_metadata(&self, key: &str) -> StoreResult<Option<StoredBlob>> {
        check_key(key)?;
        let inner = self.read_lock()?;
        Ok(inner.entries.get(key).map(|e| StoredBlob {
            data: e.data.clone(),
            metadata: e.metadata.clone(),
        }))
    }

    async fn set(&self, key: &str, data: Bytes, metadata: Option<BlobMetadata>) -> StoreResult<()> {
        check_key(key)?;
        let mut inner = self.write_lock()?;
        put(&mut inner, key, data, metadata.unwrap_or_default());
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        check_key(key)?;
        let mut inner = self.write_lock()?;
        inner.entries.remove(key);
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<String>> {
        let inner = self.read_lock()?;
        let mut keys: Vec<String> = inner.entries.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    fn supports_conditional_writes(&self) -> bool {
        self.conditional
    }

    async fn get_versioned(&self, key: &str) -> StoreResult<Option<(Bytes, Version)>> {
        if !self.conditional {
            return Err(StoreError::Unsupported("get_versioned"));
        }
        check_key(key)?;
        let inner = self.read_lock()?;
        Ok(inner
            .entries
            .get(key)
            .map(|e| (e.data.clone(), Version(e.version))))
    }

    async fn set_if_version(
        &self,
        key: &str,
        data: Bytes,
        expected: Option<Version>,
    ) -> StoreResult<bool> {
        if !self.conditional {
            return Err(StoreError::Unsupported("set_if_version"));
        }
        check_key(key)?;
        let mut inner = self.write_lock()?;
        let current = inner.entries.get(key).map(|e| Version(e.version));
        if current != expected {
            return Ok(false);
        }
        let metadata = inner
            .entries
            .get(key)
            .map(|e| e.metadata.clone())
            .unwrap_or_default();
        put(&mut inner, key, data, metadata);
        Ok(true)
    }
}

impl std::fmt::Debug for InMemoryBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBlobStore")
            .field("namespace", &self.namespace)
            .field("key_count", &self.len())
            .field("conditional", &self.conditional)
            .finish()
    }
}

/// A [`BlobBackend`] holding every namespace in memory.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    namespaces: Mutex<HashMap<String, Arc<InMemoryBlobStore>>>,
    plain: bool,
}

impl InMemoryBackend {
    /// Backend whose namespaces support conditional writes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend whose namespaces behave as a plain last-writer-wins service.
    pub fn without_conditional_writes() -> Self {
        Self {
            plain: true,
            ..Self::default()
        }
    }

    /// The typed store behind `name`, creating it if needed.
    pub fn namespace(&self, name: &str) -> StoreResult<Arc<InMemoryBlobStore>> {
        validate_namespace(name)?;
        let mut map = self
            .namespaces
            .lock()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {e}")))?;
        let store = map.entry(name.to_string()).or_insert_with(|| {
            Arc::new(if self.plain {
                InMemoryBlobStore::without_conditional_writes(name)
            } else {
                InMemoryBlobStore::new(name)
            })
        });
        Ok(Arc::clone(store))
    }
}

#[async_trait]
impl BlobBackend for InMemoryBackend {
    async fn open(&self, name: &str) -> StoreResult<Arc<dyn BlobStore>> {
        let store: Arc<dyn BlobStore> = self.namespace(name)?;
        Ok(store)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
