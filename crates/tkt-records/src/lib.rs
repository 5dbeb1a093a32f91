//! Ticket, comment and attachment records over a [`tkt_store::BlobStore`].
//!
//! Records are grouped into **collections**: one JSON array per store key.
//! Tickets live in a single `all-tickets` collection; comments and
//! attachment metadata live in one `ticket-<id>` collection per ticket, each
//! in its own namespace. File payloads are stored separately, keyed by
//! [`tkt_types::FileKey`].
//!
//! # Reads and writes
//!
//! - Listing reads degrade: a missing, malformed or unreadable collection is
//!   an empty list.
//! - Mutations load strictly: a store failure aborts the mutation rather than
//!   writing over data it could not see. Malformed values still count as
//!   empty.
//! - On stores with conditional writes, mutations retry on version mismatch
//!   up to [`RecordsConfig::optimistic_retries`] times. On plain stores the
//!   last writer wins.
//!
//! # Entry point
//!
//! [`TicketDesk`] opens all four namespaces on a [`tkt_store::BlobBackend`]
//! and hands out the three repositories.

pub mod attachments;
pub mod codec;
pub mod collection;
pub mod comments;
pub mod config;
pub mod desk;
pub mod error;
pub mod files;
pub mod locator;
pub mod tickets;

#[cfg(test)]
mod testing;

pub use attachments::AttachmentRepository;
pub use collection::{Collection, CollectionKey};
pub use comments::CommentRepository;
pub use config::RecordsConfig;
pub use desk::{namespaces, TicketDesk};
pub use error::{RecordError, RecordResult};
pub use files::{DownloadedFile, FileStore};
pub use locator::AttachmentLocator;
pub use tickets::TicketRepository;
