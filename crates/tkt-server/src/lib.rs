//! HTTP server for Ticket Desk.
//!
//! Serves the ticket, comment and attachment repositories of a
//! [`tkt_records::TicketDesk`] as a JSON API, plus raw file downloads.
//! Listing endpoints never fail on storage trouble; they return `[]`.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use config::{ServerConfig, StorageKind};
pub use error::{ServerError, ServerResult};
pub use server::TicketServer;
pub use state::AppState;
