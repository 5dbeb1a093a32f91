//! Ticket repository over the global `all-tickets` collection.

use std::sync::Arc;

use tkt_store::BlobStore;
use tkt_types::{NewTicket, Priority, Status, Ticket, TicketId, Timestamp};
use tracing::info;

use crate::collection::{Collection, CollectionKey};
use crate::config::RecordsConfig;
use crate::error::{RecordError, RecordResult};

/// Reject `None`, empty and whitespace-only values.
pub(crate) fn required(value: Option<String>, field: &'static str) -> RecordResult<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(RecordError::Validation { field }),
    }
}

/// Next id: one past the largest existing id, or 1 for an empty collection.
fn next_ticket_id(tickets: &[Ticket]) -> RecordResult<TicketId> {
    match tickets.iter().map(|t| t.id).max() {
        None => Ok(TicketId(1)),
        Some(max) => max.next().ok_or_else(|| RecordError::IdsExhausted {
            collection: CollectionKey::AllTickets.to_string(),
        }),
    }
}

/// Newest first; ties keep stored order.
fn sort_newest_first(tickets: &mut [Ticket]) {
    tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// All tickets, stored as one collection blob.
#[derive(Clone)]
pub struct TicketRepository {
    collection: Collection<Ticket>,
}

impl TicketRepository {
    pub fn new(store: Arc<dyn BlobStore>, config: &RecordsConfig) -> Self {
        Self {
            collection: Collection::new(store, config.optimistic_retries),
        }
    }

    /// Every ticket, newest first. Empty on any read failure.
    pub async fn list(&self) -> Vec<Ticket> {
        let mut tickets = self.collection.read(CollectionKey::AllTickets).await;
        sort_newest_first(&mut tickets);
        tickets
    }

    /// One ticket by id.
    pub async fn get(&self, id: TicketId) -> RecordResult<Ticket> {
        self.collection
            .load(CollectionKey::AllTickets)
            .await?
            .into_iter()
            .find(|t| t.id == id)
            .ok_or_else(|| RecordError::not_found(format!("ticket {id}")))
    }

    /// File a new ticket. The record is prepended to the stored sequence.
    pub async fn create(&self, request: NewTicket) -> RecordResult<Ticket> {
        let title = required(request.title, "title")?;
        let category = request
            .category
            .ok_or(RecordError::Validation { field: "category" })?;
        let description = required(request.description, "description")?;
        let priority = request.priority.unwrap_or_default();
        let status = request.status.unwrap_or_default();
        let created_at = request.created_at.unwrap_or_else(Timestamp::now);

        let ticket = self
            .collection
            .mutate(CollectionKey::AllTickets, |tickets| {
                let ticket = Ticket {
                    id: next_ticket_id(tickets)?,
                    title: title.clone(),
                    category,
                    priority,
                    description: description.clone(),
                    status,
                    created_at,
                };
                tickets.insert(0, ticket.clone());
                Ok(ticket)
            })
            .await?;
        info!(id = %ticket.id, category = %ticket.category, "ticket created");
        Ok(ticket)
    }

    /// Move a ticket to `status`.
    pub async fn update_status(&self, id: TicketId, status: Status) -> RecordResult<Ticket> {
        self.update(id, |t| t.status = status).await
    }

    /// Change a ticket's priority.
    pub async fn update_priority(&self, id: TicketId, priority: Priority) -> RecordResult<Ticket> {
        self.update(id, |t| t.priority = priority).await
    }

    /// Apply whichever of `status` and `priority` are given in one write.
    /// Either both land or neither does.
    pub async fn update_fields(
        &self,
        id: TicketId,
        status: Option<Status>,
        priority: Option<Priority>,
    ) -> RecordResult<Ticket> {
        self.update(id, |t| {
            if let Some(status) = status {
                t.status = status;
            }
            if let Some(priority) = priority {
                t.priority = priority;
            }
        })
        .await
    }

    async fn update<F>(&self, id: TicketId, change: F) -> RecordResult<Ticket>
    where
        F: Fn(&mut Ticket) + Send + Sync,
    {
        self.collection
            .mutate(CollectionKey::AllTickets, |tickets| {
                let ticket = tickets
                    .iter_mut()
                    .find(|t| t.id == id)
                    .ok_or_else(|| RecordError::not_found(format!("ticket {id}")))?;
                change(ticket);
                Ok(ticket.clone())
            })
            .await
    }

    /// Remove a ticket record and return it.
    ///
    /// Comment and attachment collections are left untouched; see
    /// `TicketDesk::delete_ticket` for the cascading variant.
    pub async fn delete(&self, id: TicketId) -> RecordResult<Ticket> {
        let removed = self
            .collection
            .mutate(CollectionKey::AllTickets, |tickets| {
                let index = tickets
                    .iter()
                    .position(|t| t.id == id)
                    .ok_or_else(|| RecordError::not_found(format!("ticket {id}")))?;
                Ok(tickets.remove(index))
            })
            .await?;
        info!(id = %id, "ticket deleted");
        Ok(removed)
    }
}
