//! [`TicketDesk`]: the three repositories opened over one backend.

use std::sync::Arc;

use tkt_store::{BlobBackend, BlobStore};
use tkt_types::{Ticket, TicketId};
use tracing::info;

use crate::attachments::AttachmentRepository;
use crate::comments::CommentRepository;
use crate::config::RecordsConfig;
use crate::error::RecordResult;
use crate::tickets::TicketRepository;

/// Store namespaces used by the desk.
pub mod namespaces {
    pub const TICKETS: &str = "tickets";
    pub const COMMENTS: &str = "comments";
    pub const ATTACHMENTS: &str = "attachments";
    pub const FILES: &str = "files";
}

#[derive(Clone)]
pub struct TicketDesk {
    tickets: TicketRepository,
    comments: CommentRepository,
    attachments: AttachmentRepository,
    config: RecordsConfig,
}

impl TicketDesk {
    /// Open every namespace on `backend`.
    pub async fn open(backend: &dyn BlobBackend, config: RecordsConfig) -> RecordResult<Self> {
        let tickets = backend.open(namespaces::TICKETS).await?;
        let comments = backend.open(namespaces::COMMENTS).await?;
        let attachments = backend.open(namespaces::ATTACHMENTS).await?;
        let files = backend.open(namespaces::FILES).await?;
        info!(
            backend = backend.backend_name(),
            conditional = tickets.supports_conditional_writes(),
            "ticket desk opened"
        );
        Ok(Self::with_stores(tickets, comments, attachments, files, config))
    }

    pub fn with_stores(
        tickets: Arc<dyn BlobStore>,
        comments: Arc<dyn BlobStore>,
        attachments: Arc<dyn BlobStore>,
        files: Arc<dyn BlobStore>,
        config: RecordsConfig,
    ) -> Self {
        Self {
            tickets: TicketRepository::new(tickets, &config),
            comments: CommentRepository::new(comments, &config),
            attachments: AttachmentRepository::new(attachments, files, &config),
            config,
        }
    }

    pub fn tickets(&self) -> &TicketRepository {
        &self.tickets
    }

    pub fn comments(&self) -> &CommentRepository {
        &self.comments
    }

    pub fn attachments(&self) -> &AttachmentRepository {
        &self.attachments
    }

    pub fn config(&self) -> &RecordsConfig {
        &self.config
    }

    /// Delete a ticket record. With `cascade_delete` set, its comments,
    /// attachment records and payloads go too; otherwise they are left in
    /// place, unreachable from any listing.
    pub async fn delete_ticket(&self, id: TicketId) -> RecordResult<Ticket> {
        let ticket = self.tickets.delete(id).await?;
        if self.config.cascade_delete {
            self.comments.purge(id).await?;
            let payloads = self.attachments.purge(id).await?;
            info!(id = %id, payloads, "ticket children removed");
        }
        Ok(ticket)
    }
}
