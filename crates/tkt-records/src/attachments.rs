//! Attachment repository: metadata records per ticket, payloads in the file
//! store.
//!
//! Upload and delete each touch two namespaces with no transaction between
//! them:
//!
//! - upload writes the payload, **then** appends the record. A failure in
//!   between leaves an orphan payload.
//! - delete removes the payload, **then** rewrites the collection. A failure
//!   in between leaves a record pointing at a missing payload.
//!
//! Neither window is compensated or retried.

use std::sync::Arc;

use tkt_store::BlobStore;
use tkt_types::{base_filename, Attachment, AttachmentId, FileKey, FileUpload, TicketId, Timestamp};
use tracing::{info, warn};

use crate::collection::{Collection, CollectionKey};
use crate::config::RecordsConfig;
use crate::error::{RecordError, RecordResult};
use crate::files::{DownloadedFile, FileStore};
use crate::locator::AttachmentLocator;

#[derive(Clone)]
pub struct AttachmentRepository {
    collection: Collection<Attachment>,
    files: FileStore,
    locator: AttachmentLocator,
    config: RecordsConfig,
}

impl AttachmentRepository {
    /// `records` is the attachments namespace, `payloads` the files namespace.
    pub fn new(
        records: Arc<dyn BlobStore>,
        payloads: Arc<dyn BlobStore>,
        config: &RecordsConfig,
    ) -> Self {
        let collection = Collection::new(records, config.optimistic_retries);
        Self {
            locator: AttachmentLocator::new(collection.clone()),
            collection,
            files: FileStore::new(payloads),
            config: config.clone(),
        }
    }

    fn download_url(&self, key: &FileKey) -> String {
        let encoded: String =
            url::form_urlencoded::byte_serialize(key.as_str().as_bytes()).collect();
        format!("{}?fileKey={encoded}", self.config.download_url_prefix)
    }

    /// Validate an upload and return the name it is stored under.
    fn check_upload(&self, upload: &FileUpload) -> RecordResult<String> {
        let Some(filename) = base_filename(&upload.filename) else {
            return Err(RecordError::Validation { field: "filename" });
        };
        if upload.size() > self.config.max_upload_bytes {
            return Err(RecordError::PayloadTooLarge {
                size: upload.size(),
                limit: self.config.max_upload_bytes,
            });
        }
        if !self.config.allows_content_type(&upload.content_type) {
            return Err(RecordError::UnsupportedType(upload.content_type.clone()));
        }
        Ok(filename.to_string())
    }

    /// Store a file for `ticket` and record it.
    pub async fn upload(&self, ticket: TicketId, upload: FileUpload) -> RecordResult<Attachment> {
        let filename = self.check_upload(&upload)?;
        let upload = FileUpload { filename, ..upload };

        let created_at = Timestamp::now();
        let id = AttachmentId::generate(created_at);
        let file_key = FileKey::compose(ticket, &id, &upload.filename);
        let attachment = Attachment {
            url: self.download_url(&file_key),
            id,
            ticket_id: ticket,
            filename: upload.filename.clone(),
            size: upload.size(),
            content_type: upload.content_type.clone(),
            file_key,
            created_at,
        };

        self.files.put(&attachment.file_key, &upload).await?;
        if let Err(e) = self
            .collection
            .mutate(CollectionKey::Ticket(ticket), |records| {
                records.push(attachment.clone());
                Ok(())
            })
            .await
        {
            warn!(
                file_key = %attachment.file_key,
                error = %e,
                "record append failed; payload left orphaned"
            );
            return Err(e);
        }

        info!(
            ticket = %ticket,
            attachment = %attachment.id,
            size = attachment.size,
            "attachment uploaded"
        );
        Ok(attachment)
    }

    /// Attachments of `ticket`, in upload order. Empty on any read failure.
    pub async fn list(&self, ticket: TicketId) -> Vec<Attachment> {
        self.collection.read(CollectionKey::Ticket(ticket)).await
    }

    /// Resolve a bare id to its ticket and record by scanning every
    /// collection.
    pub async fn locate(&self, id: &AttachmentId) -> RecordResult<(TicketId, Attachment)> {
        self.locator.locate(id).await
    }

    /// Delete an attachment by id alone: locate, remove payload, rewrite the
    /// owning collection without it.
    pub async fn delete(&self, id: &AttachmentId) -> RecordResult<Attachment> {
        let (ticket, attachment) = self.locator.locate(id).await?;

        self.files.remove(&attachment.file_key).await?;
        if let Err(e) = self
            .collection
            .mutate(CollectionKey::Ticket(ticket), |records| {
                records.retain(|a| &a.id != id);
                Ok(())
            })
            .await
        {
            warn!(attachment = %id, error = %e, "payload removed but record rewrite failed");
            return Err(e);
        }

        info!(ticket = %ticket, attachment = %id, "attachment deleted");
        Ok(attachment)
    }

    /// Serve a payload by its key.
    pub async fn download(&self, key: &FileKey) -> RecordResult<DownloadedFile> {
        self.files.fetch(key).await
    }

    /// Remove every payload of `ticket`, then its collection. Returns the
    /// number of payloads removed.
    pub async fn purge(&self, ticket: TicketId) -> RecordResult<usize> {
        let key = CollectionKey::Ticket(ticket);
        let records = self.collection.load(key).await?;
        for attachment in &records {
            self.files.remove(&attachment.file_key).await?;
        }
        self.collection.remove(key).await?;
        Ok(records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FlakyStore;

    struct Fixture {
        records: Arc<FlakyStore>,
        payloads: Arc<FlakyStore>,
        repo: AttachmentRepository,
    }

    fn fixture() -> Fixture {
        fixture_with(RecordsConfig::default())
    }

    fn fixture_with(config: RecordsConfig) -> Fixture {
        let records = FlakyStore::memory("attachments");
        let payloads = FlakyStore::memory("files");
        let repo = AttachmentRepository::new(records.clone(), payloads.clone(), &config);
        Fixture {
            records,
            payloads,
            repo,
        }
    }

    fn pdf(name: &str) -> FileUpload {
        FileUpload::new(name, "application/pdf", &b"%PDF-1.7"[..])
    }

    // -----------------------------------------------------------------------
    // Upload validation
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn oversize_upload_rejected_before_any_write() {
        let f = fixture();
        let big = FileUpload::new("big.pdf", "application/pdf", vec![0u8; 101 * 1024 * 1024]);
        assert!(matches!(
            f.repo.upload(TicketId(1), big).await,
            Err(RecordError::PayloadTooLarge { .. })
        ));
        assert!(f.payloads.inner().list().await.unwrap().is_empty());
        assert!(f.records.inner().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unsupported_type_rejected() {
        let f = fixture();
        let zip = FileUpload::new("a.zip", "application/zip", &b"PK"[..]);
        assert!(matches!(
            f.repo.upload(TicketId(1), zip).await,
            Err(RecordError::UnsupportedType(t)) if t == "application/zip"
        ));
        assert!(f.payloads.inner().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn size_limit_is_inclusive_and_configurable() {
        let f = fixture_with(RecordsConfig {
            max_upload_bytes: 8,
            ..RecordsConfig::default()
        });
        assert!(f.repo.upload(TicketId(1), pdf("ok.pdf")).await.is_ok());
        let nine = FileUpload::new("no.pdf", "application/pdf", &b"123456789"[..]);
        assert!(matches!(
            f.repo.upload(TicketId(1), nine).await,
            Err(RecordError::PayloadTooLarge { size: 9, limit: 8 })
        ));
    }

    #[tokio::test]
    async fn empty_filename_rejected() {
        let f = fixture();
        for name in ["", "   ", "..", "reports/"] {
            assert!(matches!(
                f.repo.upload(TicketId(1), pdf(name)).await,
                Err(RecordError::Validation { field: "filename" })
            ));
        }
        assert!(f.payloads.inner().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn directory_parts_of_filename_are_dropped() {
        let f = fixture();
        let att = f.repo.upload(TicketId(1), pdf("../../evil.pdf")).await.unwrap();
        assert_eq!(att.filename, "evil.pdf");
        assert_eq!(att.file_key.as_str(), format!("1/{}-evil.pdf", att.id));
        assert!(!att.file_key.as_str().contains(".."));

        let file = f.repo.download(&att.file_key).await.unwrap();
        assert_eq!(file.filename, "evil.pdf");

        let win = f.repo.upload(TicketId(1), pdf("C:\\tmp\\q1.pdf")).await.unwrap();
        assert_eq!(win.filename, "q1.pdf");
    }

    // -----------------------------------------------------------------------
    // Upload / list / download
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn upload_records_and_stores_payload() {
        let f = fixture();
        let att = f.repo.upload(TicketId(5), pdf("Q1 close.pdf")).await.unwrap();

        assert_eq!(att.ticket_id, TicketId(5));
        assert_eq!(att.size, 8);
        assert_eq!(att.file_key.as_str(), format!("5/{}-Q1 close.pdf", att.id));
        assert_eq!(
            att.url,
            format!("/api/download?fileKey=5%2F{}-Q1+close.pdf", att.id)
        );

        assert_eq!(f.repo.list(TicketId(5)).await, vec![att.clone()]);

        let file = f.repo.download(&att.file_key).await.unwrap();
        assert_eq!(&file.data[..], b"%PDF-1.7");
        assert_eq!(file.content_type, "application/pdf");
        assert_eq!(file.filename, "Q1 close.pdf");
    }

    #[tokio::test]
    async fn list_preserves_upload_order() {
        let f = fixture();
        let a = f.repo.upload(TicketId(1), pdf("a.pdf")).await.unwrap();
        let b = f.repo.upload(TicketId(1), pdf("b.pdf")).await.unwrap();
        let c = f.repo.upload(TicketId(1), pdf("c.pdf")).await.unwrap();
        let ids: Vec<_> = f.repo.list(TicketId(1)).await.into_iter().map(|x| x.id).collect();
        assert_eq!(ids, vec![a.id, b.id, c.id]);
    }

    #[tokio::test]
    async fn download_missing_is_not_found() {
        let f = fixture();
        assert!(matches!(
            f.repo.download(&FileKey::new("1/none")).await,
            Err(RecordError::NotFound { .. })
        ));
    }

    // -----------------------------------------------------------------------
    // Delete
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn delete_by_bare_id() {
        let f = fixture();
        let keep = f.repo.upload(TicketId(1), pdf("keep.pdf")).await.unwrap();
        let gone = f.repo.upload(TicketId(2), pdf("gone.pdf")).await.unwrap();

        let removed = f.repo.delete(&gone.id).await.unwrap();
        assert_eq!(removed.id, gone.id);

        assert!(matches!(f.repo.locate(&gone.id).await, Err(RecordError::NotFound { .. })));
        assert!(matches!(
            f.repo.download(&gone.file_key).await,
            Err(RecordError::NotFound { .. })
        ));
        assert!(f.repo.list(TicketId(2)).await.is_empty());
        assert_eq!(f.repo.list(TicketId(1)).await, vec![keep]);
    }

    #[tokio::test]
    async fn delete_unknown_id_is_not_found() {
        let f = fixture();
        f.repo.upload(TicketId(1), pdf("a.pdf")).await.unwrap();
        assert!(matches!(
            f.repo.delete(&AttachmentId::new("0-missing")).await,
            Err(RecordError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn failed_payload_delete_leaves_record() {
        let f = fixture();
        let att = f.repo.upload(TicketId(1), pdf("a.pdf")).await.unwrap();
        f.payloads.fail_deletes(true);
        assert!(f.repo.delete(&att.id).await.is_err());
        assert_eq!(f.repo.list(TicketId(1)).await.len(), 1);
    }

    #[tokio::test]
    async fn failed_record_rewrite_leaves_dangling_record() {
        let f = fixture();
        let att = f.repo.upload(TicketId(1), pdf("a.pdf")).await.unwrap();
        f.records.fail_sets(true);
        assert!(f.repo.delete(&att.id).await.is_err());

        // Record still listed, payload already gone.
        f.records.fail_sets(false);
        assert_eq!(f.repo.list(TicketId(1)).await.len(), 1);
        assert!(f.repo.download(&att.file_key).await.is_err());
    }

    // -----------------------------------------------------------------------
    // Partial failure on upload
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn failed_record_append_orphans_payload() {
        let f = fixture();
        f.records.fail_sets(true);
        assert!(matches!(
            f.repo.upload(TicketId(3), pdf("orphan.pdf")).await,
            Err(RecordError::StoreUnavailable(_))
        ));
        f.records.fail_sets(false);

        // The payload is downloadable but no record references it.
        let keys = f.payloads.inner().list().await.unwrap();
        assert_eq!(keys.len(), 1);
        let file = f.repo.download(&FileKey::new(keys[0].clone())).await.unwrap();
        assert_eq!(file.filename, "orphan.pdf");
        assert!(f.repo.list(TicketId(3)).await.is_empty());
    }

    // -----------------------------------------------------------------------
    // Purge
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn purge_removes_payloads_and_collection() {
        let f = fixture();
        let a = f.repo.upload(TicketId(1), pdf("a.pdf")).await.unwrap();
        f.repo.upload(TicketId(1), pdf("b.pdf")).await.unwrap();
        let other = f.repo.upload(TicketId(2), pdf("c.pdf")).await.unwrap();

        assert_eq!(f.repo.purge(TicketId(1)).await.unwrap(), 2);
        assert!(f.repo.list(TicketId(1)).await.is_empty());
        assert!(f.repo.download(&a.file_key).await.is_err());
        assert!(f.repo.download(&other.file_key).await.is_ok());
    }
}
