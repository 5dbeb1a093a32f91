//! Resolve a bare attachment id to its owning ticket.
//!
//! Attachment ids are not namespaced by ticket, and the store has no
//! secondary index, so resolution lists every key of the attachments
//! namespace and scans each per-ticket collection in turn. Cost is
//! O(tickets × attachments per ticket) per lookup.

use tkt_types::{Attachment, AttachmentId, TicketId};
use tracing::debug;

use crate::collection::Collection;
use crate::error::{RecordError, RecordResult};

#[derive(Clone)]
pub struct AttachmentLocator {
    collection: Collection<Attachment>,
}

impl AttachmentLocator {
    pub fn new(collection: Collection<Attachment>) -> Self {
        Self { collection }
    }

    /// Find the first collection holding `id`, in store listing order.
    ///
    /// Malformed collections are skipped. Store failures are returned, since
    /// a lookup that could not see every collection cannot claim absence.
    pub async fn locate(&self, id: &AttachmentId) -> RecordResult<(TicketId, Attachment)> {
        let keys = self.collection.ticket_keys().await?;
        let scanned = keys.len();
        for key in keys {
            let Some(ticket) = key.ticket() else {
                continue;
            };
            let records = self.collection.load(key).await?;
            if let Some(found) = records.into_iter().find(|a| &a.id == id) {
                debug!(attachment = %id, ticket = %ticket, "attachment located");
                return Ok((ticket, found));
            }
        }
        debug!(attachment = %id, scanned, "attachment not found in any collection");
        Err(RecordError::not_found(format!("attachment {id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::CollectionKey;
    use crate::testing::FlakyStore;
    use bytes::Bytes;
    use tkt_store::BlobStore;
    use tkt_types::{FileKey, Timestamp};

    fn attachment(ticket: u64, id: &str) -> Attachment {
        let id = AttachmentId::new(id);
        let file_key = FileKey::compose(TicketId(ticket), &id, "f.txt");
        Attachment {
            url: format!("/api/download?fileKey={file_key}"),
            id,
            ticket_id: TicketId(ticket),
            filename: "f.txt".into(),
            size: 1,
            content_type: "text/plain".into(),
            file_key,
            created_at: Timestamp::from_millis(0),
        }
    }

    #[tokio::test]
    async fn locates_across_tickets() {
        let store = FlakyStore::memory("attachments");
        let collection: Collection<Attachment> = Collection::new(store, 0);
        collection
            .write(CollectionKey::Ticket(TicketId(1)), &[attachment(1, "1-a")])
            .await
            .unwrap();
        collection
            .write(
                CollectionKey::Ticket(TicketId(2)),
                &[attachment(2, "2-b"), attachment(2, "2-c")],
            )
            .await
            .unwrap();

        let locator = AttachmentLocator::new(collection);
        let (ticket, found) = locator.locate(&AttachmentId::new("2-c")).await.unwrap();
        assert_eq!(ticket, TicketId(2));
        assert_eq!(found.id.as_str(), "2-c");
    }

    #[tokio::test]
    async fn missing_id_is_not_found_after_full_scan() {
        let store = FlakyStore::memory("attachments");
        let collection: Collection<Attachment> = Collection::new(store, 0);
        collection
            .write(CollectionKey::Ticket(TicketId(1)), &[attachment(1, "1-a")])
            .await
            .unwrap();
        let locator = AttachmentLocator::new(collection);
        assert!(matches!(
            locator.locate(&AttachmentId::new("nope")).await,
            Err(RecordError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn corrupt_and_foreign_keys_are_skipped() {
        let store = FlakyStore::memory("attachments");
        store.set("ticket-1", Bytes::from_static(b"garbage"), None).await.unwrap();
        store.set("index", Bytes::from_static(b"[]"), None).await.unwrap();
        let collection: Collection<Attachment> = Collection::new(store, 0);
        collection
            .write(CollectionKey::Ticket(TicketId(2)), &[attachment(2, "2-b")])
            .await
            .unwrap();

        let locator = AttachmentLocator::new(collection);
        let (ticket, _) = locator.locate(&AttachmentId::new("2-b")).await.unwrap();
        assert_eq!(ticket, TicketId(2));
    }

    #[tokio::test]
    async fn store_outage_is_not_reported_as_absence() {
        let store = FlakyStore::memory("attachments");
        let collection: Collection<Attachment> = Collection::new(store.clone(), 0);
        let locator = AttachmentLocator::new(collection);
        store.fail_reads(true);
        assert!(matches!(
            locator.locate(&AttachmentId::new("x")).await,
            Err(RecordError::StoreUnavailable(_))
        ));
    }
}
