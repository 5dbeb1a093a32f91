use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;

/// Ticket Desk HTTP server.
pub struct TicketServer {
    config: ServerConfig,
    state: AppState,
}

impl TicketServer {
    /// Open storage as configured.
    pub async fn open(config: ServerConfig) -> ServerResult<Self> {
        let state = AppState::open(&config).await?;
        Ok(Self { config, state })
    }

    /// Serve an already opened desk.
    pub fn with_state(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone(), self.config.body_limit())
    }

    /// Start serving requests.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!(
            addr = %self.config.bind_addr,
            storage = ?self.config.storage,
            "ticket desk server listening"
        );
        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}
