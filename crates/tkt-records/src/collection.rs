//! Generic read-modify-write over one collection blob.
//!
//! A collection is an ordered list of records stored as a single value. Every
//! mutation reads the whole value, changes it in memory, and writes the whole
//! value back. On a plain store this is **not atomic**: two mutations racing
//! on one key both read the same snapshot and the later write discards the
//! earlier one (lost update). On a store with conditional writes the write is
//! made conditional on the version that was read and retried on mismatch.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tkt_store::BlobStore;
use tkt_types::TicketId;
use tracing::{debug, warn};

use crate::codec;
use crate::error::{RecordError, RecordResult};

/// Key of a collection blob within its namespace.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CollectionKey {
    /// The single global ticket collection, `all-tickets`.
    AllTickets,
    /// A per-ticket collection, `ticket-<id>`.
    Ticket(TicketId),
}

impl CollectionKey {
    pub const ALL_TICKETS: &'static str = "all-tickets";
    pub const TICKET_PREFIX: &'static str = "ticket-";

    /// Parse a stored key back into a collection key.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw == Self::ALL_TICKETS {
            return Some(Self::AllTickets);
        }
        let id = raw.strip_prefix(Self::TICKET_PREFIX)?.parse().ok()?;
        Some(Self::Ticket(id))
    }

    /// The owning ticket of a per-ticket collection.
    pub fn ticket(&self) -> Option<TicketId> {
        match self {
            Self::AllTickets => None,
            Self::Ticket(id) => Some(*id),
        }
    }
}

impl fmt::Display for CollectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllTickets => f.write_str(Self::ALL_TICKETS),
            Self::Ticket(id) => write!(f, "{}{id}", Self::TICKET_PREFIX),
        }
    }
}

/// Typed access to the collections of one namespace.
pub struct Collection<T> {
    store: Arc<dyn BlobStore>,
    retries: u32,
    _records: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            retries: self.retries,
            _records: PhantomData,
        }
    }
}

impl<T> Collection<T>
where
    T: Serialize + DeserializeOwned + Send,
{
    /// `retries` bounds the extra attempts of the optimistic loop.
    pub fn new(store: Arc<dyn BlobStore>, retries: u32) -> Self {
        Self {
            store,
            retries,
            _records: PhantomData,
        }
    }

    pub fn store(&self) -> &Arc<dyn BlobStore> {
        &self.store
    }

    /// Read for display: any failure, store outage included, yields an
    /// empty collection.
    pub async fn read(&self, key: CollectionKey) -> Vec<T> {
        match self.load(key).await {
            Ok(records) => records,
            Err(e) => {
                warn!(
                    namespace = self.store.namespace(),
                    key = %key,
                    error = %e,
                    "collection read failed; returning empty"
                );
                Vec::new()
            }
        }
    }

    /// Read for mutation: an absent or malformed blob is empty, but store
    /// failures are returned so a mutation never overwrites data it could
    /// not see.
    pub async fn load(&self, key: CollectionKey) -> RecordResult<Vec<T>> {
        let name = key.to_string();
        Ok(match self.store.get(&name).await? {
            Some(raw) => codec::decode_or_empty(&name, &raw),
            None => Vec::new(),
        })
    }

    /// Replace the whole collection.
    pub async fn write(&self, key: CollectionKey, records: &[T]) -> RecordResult<()> {
        let name = key.to_string();
        let encoded = codec::encode(records)?;
        self.store.set(&name, encoded, None).await?;
        debug!(
            namespace = self.store.namespace(),
            key = %name,
            count = records.len(),
            "collection written"
        );
        Ok(())
    }

    /// Delete the whole collection blob.
    pub async fn remove(&self, key: CollectionKey) -> RecordResult<()> {
        self.store.delete(&key.to_string()).await?;
        Ok(())
    }

    /// Every key in the namespace that names a per-ticket collection.
    pub async fn ticket_keys(&self) -> RecordResult<Vec<CollectionKey>> {
        let keys = self.store.list_prefix(CollectionKey::TICKET_PREFIX).await?;
        Ok(keys
            .iter()
            .filter_map(|k| CollectionKey::parse(k))
            .filter(|k| k.ticket().is_some())
            .collect())
    }

    /// Read-modify-write one collection.
    ///
    /// `apply` transforms the records in place; returning an error aborts
    /// without writing. It may run more than once when a conditional write
    /// loses a race, each time against a fresh snapshot.
    pub async fn mutate<R, F>(&self, key: CollectionKey, mut apply: F) -> RecordResult<R>
    where
        F: FnMut(&mut Vec<T>) -> RecordResult<R> + Send,
        R: Send,
    {
        if !self.store.supports_conditional_writes() {
            let mut records = self.load(key).await?;
            let out = apply(&mut records)?;
            self.write(key, &records).await?;
            return Ok(out);
        }

        let name = key.to_string();
        let attempts = self.retries.saturating_add(1);
        for attempt in 1..=attempts {
            let (mut records, version) = match self.store.get_versioned(&name).await? {
                Some((raw, version)) => (codec::decode_or_empty(&name, &raw), Some(version)),
                None => (Vec::new(), None),
            };
            let out = apply(&mut records)?;
            let encoded = codec::encode(&records)?;
            if self.store.set_if_version(&name, encoded, version).await? {
                debug!(
                    namespace = self.store.namespace(),
                    key = %name,
                    count = records.len(),
                    attempt,
                    "collection written"
                );
                return Ok(out);
            }
            debug!(
                namespace = self.store.namespace(),
                key = %name,
                attempt,
                "version moved; retrying"
            );
        }
        Err(RecordError::Conflict {
            key: name,
            attempts,
        })
    }
}
