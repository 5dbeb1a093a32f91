//! Local filesystem blob store.
//!
//! Layout under the backend root:
//!
//! ```text
//! <root>/<namespace>/data/<encoded-key>   value bytes
//! <root>/<namespace>/meta/<encoded-key>   metadata as a JSON object
//! <root>/<namespace>/keys/<encoded-key>   original key, hashed names only
//! ```
//!
//! Keys are escaped into a single file name, so keys containing `/` (file
//! payload keys do) never create directories and can never escape the root.
//! A key whose escaped form is too long for one path component is stored
//! under `~` followed by the hex BLAKE3 digest of the key instead, and the
//! key itself is kept in `keys/` so listing can recover it.
//! Writes go to a temporary file and are renamed into place.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::blob::{BlobMetadata, StoredBlob};
use crate::error::{StoreError, StoreResult};
use crate::traits::{validate_namespace, BlobBackend, BlobStore};

/// Longest escaped file name; longer keys are stored under a digest.
const MAX_ENCODED_LEN: usize = 240;

/// First character of digest file names. Never produced by escaping.
const HASHED_MARKER: char = '~';

/// Escape a key into a file name.
///
/// `[A-Za-z0-9._-]` pass through, except a leading `.`; every other byte
/// becomes `%xx`. Encoded names therefore never start with `.`, which keeps
/// them apart from in-flight temporary files. Escaped names longer than
/// [`MAX_ENCODED_LEN`] are replaced by [`hashed_name`].
pub fn encode_key(key: &str) -> StoreResult<String> {
    if key.is_empty() {
        return Err(StoreError::InvalidKey("empty key".into()));
    }
    let mut out = String::with_capacity(key.len());
    for (i, b) in key.bytes().enumerate() {
        let plain = b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || (b == b'.' && i > 0);
        if plain {
            out.push(b as char);
        } else {
            out.push('%');
            out.push_str(&hex::encode([b]));
        }
    }
    if out.len() > MAX_ENCODED_LEN {
        return Ok(hashed_name(key));
    }
    Ok(out)
}

/// Bounded file name for a key too long to escape in place.
pub fn hashed_name(key: &str) -> String {
    let digest = blake3::hash(key.as_bytes());
    format!("{HASHED_MARKER}{}", hex::encode(digest.as_bytes()))
}

fn is_hashed(name: &str) -> bool {
    name.starts_with(HASHED_MARKER)
}

/// Reverse of [`encode_key`]. Returns `None` for names it did not produce.
pub fn decode_key(name: &str) -> Option<String> {
    let mut bytes = Vec::with_capacity(name.len());
    let raw = name.as_bytes();
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'%' {
            let pair = name.get(i + 1..i + 3)?;
            let decoded = hex::decode(pair).ok()?;
            bytes.extend_from_slice(&decoded);
            i += 3;
        } else {
            bytes.push(raw[i]);
            i += 1;
        }
    }
    String::from_utf8(bytes).ok()
}

/// One namespace directory on disk.
#[derive(Debug)]
pub struct FsBlobStore {
    namespace: String,
    data_dir: PathBuf,
    meta_dir: PathBuf,
    keys_dir: PathBuf,
}

impl FsBlobStore {
    /// Open (creating if needed) the namespace directory under `root`.
    pub async fn open(root: impl AsRef<Path>, namespace: &str) -> StoreResult<Self> {
        validate_namespace(namespace)?;
        let base = root.as_ref().join(namespace);
        let data_dir = base.join("data");
        let meta_dir = base.join("meta");
        let keys_dir = base.join("keys");
        fs::create_dir_all(&data_dir).await?;
        fs::create_dir_all(&meta_dir).await?;
        fs::create_dir_all(&keys_dir).await?;
        Ok(Self {
            namespace: namespace.to_string(),
            data_dir,
            meta_dir,
            keys_dir,
        })
    }

    /// Recover the key stored under a file name from `data/`.
    async fn key_for(&self, name: &str) -> StoreResult<Option<String>> {
        if !is_hashed(name) {
            return Ok(decode_key(name));
        }
        let Some(raw) = Self::read_optional(&self.keys_dir.join(name)).await? else {
            return Ok(None);
        };
        Ok(String::from_utf8(raw).ok())
    }

    async fn write_atomic(dir: &Path, name: &str, data: &[u8]) -> StoreResult<()> {
        let temp_path = dir.join(format!(".tmp.{}", Uuid::now_v7()));
        {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(data).await?;
            file.sync_all().await?;
        }
        if let Err(e) = fs::rename(&temp_path, dir.join(name)).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn remove_if_present(path: &Path) -> StoreResult<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn read_optional(path: &Path) -> StoreResult<Option<Vec<u8>>> {
        match fs::read(path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn get_with_metadata(&self, key: &str) -> StoreResult<Option<StoredBlob>> {
        let name = encode_key(key)?;
        let Some(data) = Self::read_optional(&self.data_dir.join(&name)).await? else {
            return Ok(None);
        };
        let metadata = match Self::read_optional(&self.meta_dir.join(&name)).await? {
            Some(raw) => serde_json::from_slice(&raw)
                .map_err(|e| StoreError::Metadata(format!("{key}: {e}")))?,
            None => BlobMetadata::default(),
        };
        Ok(Some(StoredBlob {
            data: Bytes::from(data),
            metadata,
        }))
    }

    async fn set(&self, key: &str, data: Bytes, metadata: Option<BlobMetadata>) -> StoreResult<()> {
        let name = encode_key(key)?;
        if is_hashed(&name) {
            Self::write_atomic(&self.keys_dir, &name, key.as_bytes()).await?;
        }
        match metadata.filter(|m| !m.is_empty()) {
            Some(meta) => {
                let raw = serde_json::to_vec(&meta)
                    .map_err(|e| StoreError::Metadata(format!("{key}: {e}")))?;
                Self::write_atomic(&self.meta_dir, &name, &raw).await?;
            }
            None => Self::remove_if_present(&self.meta_dir.join(&name)).await?,
        }
        Self::write_atomic(&self.data_dir, &name, &data).await?;
        debug!(namespace = %self.namespace, key, len = data.len(), "blob written");
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let name = encode_key(key)?;
        Self::remove_if_present(&self.data_dir.join(&name)).await?;
        Self::remove_if_present(&self.meta_dir.join(&name)).await?;
        if is_hashed(&name) {
            Self::remove_if_present(&self.keys_dir.join(&name)).await?;
        }
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut entries = fs::read_dir(&self.data_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            match self.key_for(name).await? {
                Some(key) => keys.push(key),
                None => {
                    warn!(namespace = %self.namespace, file = name, "skipping unrecognized file")
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// A [`BlobBackend`] storing each namespace in a directory under `root`.
#[derive(Debug, Clone)]
pub struct FsBackend {
    root: PathBuf,
}

impl FsBackend {
    /// Create the backend, creating `root` if needed.
    pub async fn new(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }
}

#[async_trait]
impl BlobBackend for FsBackend {
    async fn open(&self, name: &str) -> StoreResult<Arc<dyn BlobStore>> {
        let store = FsBlobStore::open(&self.root, name).await?;
        Ok(Arc::new(store))
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }
}
