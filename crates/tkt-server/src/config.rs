use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tkt_records::RecordsConfig;

use crate::error::{ServerError, ServerResult};

/// Which blob backend the server opens.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// One directory per namespace under `data_dir`.
    #[default]
    Fs,
    /// Process-local; everything is lost on exit.
    Memory,
}

/// Allowance for multipart boundaries and part headers around an upload.
pub const MULTIPART_HEADROOM: u64 = 1024 * 1024;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub storage: StorageKind,
    /// Request body cap. When unset it follows `records.max_upload_bytes`
    /// plus [`MULTIPART_HEADROOM`] for multipart framing.
    pub max_body_bytes: Option<u64>,
    pub records: RecordsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8787)),
            data_dir: PathBuf::from("./data"),
            storage: StorageKind::Fs,
            max_body_bytes: None,
            records: RecordsConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Read a TOML config file. Absent keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> ServerResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))
    }

    /// The request body cap actually enforced.
    pub fn body_limit(&self) -> u64 {
        self.max_body_bytes
            .unwrap_or_else(|| self.records.max_upload_bytes.saturating_add(MULTIPART_HEADROOM))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = ServerConfig::default();
        assert_eq!(c.bind_addr, "127.0.0.1:8787".parse::<SocketAddr>().unwrap());
        assert_eq!(c.data_dir, PathBuf::from("./data"));
        assert_eq!(c.storage, StorageKind::Fs);
        assert_eq!(c.max_body_bytes, None);
        assert_eq!(c.body_limit(), 101 * 1024 * 1024);
        assert!(!c.records.cascade_delete);
    }

    #[test]
    fn load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tkt.toml");
        let raw = "bind_addr = \"0.0.0.0:9000\"\nstorage = \"memory\"\n\n\
                   [records]\ncascade_delete = true\n";
        std::fs::write(&path, raw).unwrap();

        let c = ServerConfig::load(&path).unwrap();
        assert_eq!(c.bind_addr.port(), 9000);
        assert_eq!(c.storage, StorageKind::Memory);
        assert!(c.records.cascade_delete);
        assert_eq!(c.records.optimistic_retries, 5);
        assert_eq!(c.data_dir, PathBuf::from("./data"));
    }

    #[test]
    fn body_limit_follows_configured_upload_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tkt.toml");
        std::fs::write(&path, "[records]\nmax_upload_bytes = 524288000\n").unwrap();
        let c = ServerConfig::load(&path).unwrap();
        assert_eq!(c.body_limit(), 524_288_000 + MULTIPART_HEADROOM);

        std::fs::write(&path, "max_body_bytes = 4096\n[records]\nmax_upload_bytes = 1\n").unwrap();
        assert_eq!(ServerConfig::load(&path).unwrap().body_limit(), 4096);
    }

    #[test]
    fn load_rejects_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "storage = \"tape\"").unwrap();
        assert!(matches!(ServerConfig::load(&path), Err(ServerError::Config(_))));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        assert!(matches!(
            ServerConfig::load("/nonexistent/tkt.toml"),
            Err(ServerError::Io(_))
        ));
    }
}
