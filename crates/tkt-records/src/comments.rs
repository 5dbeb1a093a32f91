//! Comment repository: one collection per ticket.

use std::sync::Arc;

use tkt_store::BlobStore;
use tkt_types::{Comment, CommentId, NewComment, TicketId, Timestamp};
use tracing::debug;

use crate::collection::{Collection, CollectionKey};
use crate::config::RecordsConfig;
use crate::error::{RecordError, RecordResult};
use crate::tickets::required;

/// One past the largest id in the collection. Unlike a count-based id this
/// cannot collide once comments are ever removed.
fn next_comment_id(ticket: TicketId, comments: &[Comment]) -> RecordResult<CommentId> {
    match comments.iter().map(|c| c.id).max() {
        None => Ok(CommentId(1)),
        Some(max) => max.next().ok_or_else(|| RecordError::IdsExhausted {
            collection: CollectionKey::Ticket(ticket).to_string(),
        }),
    }
}

#[derive(Clone)]
pub struct CommentRepository {
    collection: Collection<Comment>,
}

impl CommentRepository {
    pub fn new(store: Arc<dyn BlobStore>, config: &RecordsConfig) -> Self {
        Self {
            collection: Collection::new(store, config.optimistic_retries),
        }
    }

    /// Comments on `ticket`, oldest first. Empty on any read failure.
    pub async fn list(&self, ticket: TicketId) -> Vec<Comment> {
        let mut comments = self.collection.read(CollectionKey::Ticket(ticket)).await;
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        comments
    }

    /// Append a comment to `ticket`'s collection.
    ///
    /// The ticket itself is not checked for existence.
    pub async fn create(&self, ticket: TicketId, request: NewComment) -> RecordResult<Comment> {
        let content = required(request.content, "content")?;
        let created_at = request.created_at.unwrap_or_else(Timestamp::now);

        let comment = self
            .collection
            .mutate(CollectionKey::Ticket(ticket), |comments| {
                let comment = Comment {
                    id: next_comment_id(ticket, comments)?,
                    content: content.clone(),
                    created_at,
                };
                comments.push(comment.clone());
                Ok(comment)
            })
            .await?;
        debug!(ticket = %ticket, id = %comment.id, "comment added");
        Ok(comment)
    }

    /// Drop the whole comment collection of `ticket`.
    pub async fn purge(&self, ticket: TicketId) -> RecordResult<()> {
        self.collection.remove(CollectionKey::Ticket(ticket)).await
    }
}
