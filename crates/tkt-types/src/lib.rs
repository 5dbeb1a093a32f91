//! Record types for Ticket Desk.
//!
//! Every other Ticket Desk crate depends on `tkt-types`. The types here are
//! the JSON shapes persisted inside collection blobs, so their serde layout
//! is part of the storage format.
//!
//! # Key Types
//!
//! - [`Ticket`] / [`NewTicket`] -- a filed request and the fields used to create one
//! - [`Comment`] / [`NewComment`] -- a note appended to a ticket
//! - [`Attachment`] / [`FileUpload`] -- file metadata record and incoming upload
//! - [`TicketId`], [`CommentId`], [`AttachmentId`], [`FileKey`] -- identifiers
//! - [`Timestamp`] -- UTC instant serialized as RFC 3339 with milliseconds

pub mod attachment;
pub mod comment;
pub mod error;
pub mod ids;
pub mod temporal;
pub mod ticket;

pub use attachment::{
    base_filename, Attachment, FileUpload, ALLOWED_CONTENT_TYPES, MAX_UPLOAD_BYTES,
};
pub use comment::{Comment, NewComment};
pub use error::TypeError;
pub use ids::{AttachmentId, CommentId, FileKey, TicketId};
pub use temporal::Timestamp;
pub use ticket::{Category, NewTicket, Priority, Status, Ticket};
