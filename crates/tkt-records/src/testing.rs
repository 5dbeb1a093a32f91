//! Fault-injecting store wrapper shared by the unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use tkt_store::{
    BlobMetadata, BlobStore, InMemoryBlobStore, StoreError, StoreResult, StoredBlob, Version,
};

/// Wraps a store and fails or interferes with selected calls.
pub(crate) struct FlakyStore {
    inner: Arc<dyn BlobStore>,
    fail_sets: AtomicBool,
    fail_reads: AtomicBool,
    fail_deletes: AtomicBool,
    // (pending writes remaining, key, value) applied right after a read
    interleave: Mutex<Option<(usize, String, Bytes)>>,
    pub sets: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: Arc<dyn BlobStore>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            fail_sets: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
            interleave: Mutex::new(None),
            sets: AtomicUsize::new(0),
        })
    }

    pub fn memory(namespace: &str) -> Arc<Self> {
        Self::new(Arc::new(InMemoryBlobStore::new(namespace)))
    }

    pub fn plain(namespace: &str) -> Arc<Self> {
        Self::new(Arc::new(InMemoryBlobStore::without_conditional_writes(namespace)))
    }

    pub fn fail_sets(&self, on: bool) {
        self.fail_sets.store(on, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, on: bool) {
        self.fail_reads.store(on, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, on: bool) {
        self.fail_deletes.store(on, Ordering::SeqCst);
    }

    /// After each of the next `times` reads, write `value` under `key`
    /// behind the reader's back, as a concurrent writer would.
    pub fn interleave_write(&self, times: usize, key: &str, value: Bytes) {
        *self.interleave.lock().unwrap() = Some((times, key.to_string(), value));
    }

    pub fn inner(&self) -> &Arc<dyn BlobStore> {
        &self.inner
    }

    fn outage() -> StoreError {
        StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "injected outage",
        ))
    }

    async fn maybe_interleave(&self) {
        let pending = {
            let mut slot = self.interleave.lock().unwrap();
            match slot.as_mut() {
                Some((n, key, value)) if *n > 0 => {
                    *n -= 1;
                    Some((key.clone(), value.clone()))
                }
                _ => None,
            }
        };
        if let Some((key, value)) = pending {
            self.inner.set(&key, value, None).await.unwrap();
        }
    }
}

#[async_trait]
impl BlobStore for FlakyStore {
    fn namespace(&self) -> &str {
        self.inner.namespace()
    }

    async fn get_with_metadata(&self, key: &str) -> StoreResult<Option<StoredBlob>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Self::outage());
        }
        let out = self.inner.get_with_metadata(key).await;
        self.maybe_interleave().await;
        out
    }

    async fn set(&self, key: &str, data: Bytes, metadata: Option<BlobMetadata>) -> StoreResult<()> {
        if self.fail_sets.load(Ordering::SeqCst) {
            return Err(Self::outage());
        }
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, data, metadata).await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(Self::outage());
        }
        self.inner.delete(key).await
    }

    async fn list(&self) -> StoreResult<Vec<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Self::outage());
        }
        self.inner.list().await
    }

    fn supports_conditional_writes(&self) -> bool {
        self.inner.supports_conditional_writes()
    }

    async fn get_versioned(&self, key: &str) -> StoreResult<Option<(Bytes, Version)>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Self::outage());
        }
        let out = self.inner.get_versioned(key).await;
        self.maybe_interleave().await;
        out
    }

    async fn set_if_version(
        &self,
        key: &str,
        data: Bytes,
        expected: Option<Version>,
    ) -> StoreResult<bool> {
        if self.fail_sets.load(Ordering::SeqCst) {
            return Err(Self::outage());
        }
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set_if_version(key, data, expected).await
    }
}
