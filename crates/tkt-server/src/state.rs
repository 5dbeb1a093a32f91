use std::sync::Arc;

use tkt_records::TicketDesk;
use tkt_store::{FsBackend, InMemoryBackend};

use crate::config::{ServerConfig, StorageKind};
use crate::error::ServerResult;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub desk: Arc<TicketDesk>,
}

impl AppState {
    pub fn new(desk: TicketDesk) -> Self {
        Self { desk: Arc::new(desk) }
    }

    /// Open the configured backend and the desk over it.
    pub async fn open(config: &ServerConfig) -> ServerResult<Self> {
        let desk = match config.storage {
            StorageKind::Fs => {
                let backend = FsBackend::new(&config.data_dir).await?;
                TicketDesk::open(&backend, config.records.clone()).await?
            }
            StorageKind::Memory => {
                TicketDesk::open(&InMemoryBackend::new(), config.records.clone()).await?
            }
        };
        Ok(Self::new(desk))
    }
}
