use serde::{Deserialize, Serialize};

use crate::ids::CommentId;
use crate::temporal::Timestamp;

/// A note on a ticket, stored in the ticket's comment collection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub content: String,
    pub created_at: Timestamp,
}

/// Caller-supplied fields for a new comment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewComment {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
}

impl NewComment {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            created_at: None,
        }
    }

    pub fn created_at(mut self, at: Timestamp) -> Self {
        self.created_at = Some(at);
        self
    }
}
