//! Namespaced key→blob storage for Ticket Desk.
//!
//! The store is deliberately dumb: whole-value get/set/delete per key and a
//! full listing per namespace. It never interprets values. Record structure,
//! ordering and cross-collection lookup are layered on top by `tkt-records`.
//!
//! # Backends
//!
//! All namespaces implement the [`BlobStore`] trait and are opened through a
//! [`BlobBackend`]:
//!
//! - [`InMemoryBackend`] -- `HashMap`-based, for tests and embedding; supports
//!   conditional writes unless built as a plain store
//! - [`FsBackend`] -- one directory per namespace, durable across restarts;
//!   last writer wins
//!
//! # Design Rules
//!
//! 1. Values are opaque bytes; metadata is a separate string map.
//! 2. No operation is atomic with any other unless the backend advertises
//!    conditional writes.
//! 3. Deleting an absent key succeeds.
//! 4. I/O errors are propagated, never swallowed; degrading is the caller's call.

pub mod blob;
pub mod error;
pub mod fs;
pub mod memory;
pub mod traits;

pub use blob::{BlobMetadata, StoredBlob, Version};
pub use error::{StoreError, StoreResult};
pub use fs::{FsBackend, FsBlobStore};
pub use memory::{InMemoryBackend, InMemoryBlobStore};
pub use traits::{BlobBackend, BlobStore};
