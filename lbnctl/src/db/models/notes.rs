//! Database models for notes.

use crate::api::models::notes::{NoteCreate, NoteUpdate};
use crate::types::{NoteId, UserId};
use chrono::{DateTime, Utc};

/// Database request for creating a new note
#[derive(Debug, Clone)]
pub struct NoteCreateDBRequest {
    pub subject: String,
    pub description: Option<String>,
    pub author: Option<UserId>,
}

impl From<NoteCreate> for NoteCreateDBRequest {
    fn from(api: NoteCreate) -> Self {
        Self {
            subject: api.subject,
            description: api.description,
            author: api.author,
        }
    }
}

/// Database request for a partial note update
#[derive(Debug, Clone, Default)]
pub struct NoteUpdateDBRequest {
    pub subject: Option<String>,
    pub description: Option<String>,
    pub author: Option<UserId>,
}

impl From<NoteUpdate> for NoteUpdateDBRequest {
    fn from(api: NoteUpdate) -> Self {
        Self {
            subject: api.subject,
            description: api.description,
            author: api.author,
        }
    }
}

/// Database response for a note
#[derive(Debug, Clone)]
pub struct NoteDBResponse {
    pub id: NoteId,
    pub subject: String,
    pub description: Option<String>,
    pub author: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
