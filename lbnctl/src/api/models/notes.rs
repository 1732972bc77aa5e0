//! API request/response models for notes.

use super::query::ListParams;
use crate::db::handlers::notes::{NoteFilter, SORTABLE};
use crate::db::models::notes::NoteDBResponse;
use crate::errors::Result;
use crate::types::{LibraryId, NoteId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NoteCreate {
    pub subject: String,
    pub description: Option<String>,
    pub author: Option<UserId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct NoteUpdate {
    pub subject: Option<String>,
    pub description: Option<String>,
    pub author: Option<UserId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NoteResponse {
    pub id: NoteId,
    pub subject: String,
    pub description: Option<String>,
    pub author: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<NoteDBResponse> for NoteResponse {
    fn from(db: NoteDBResponse) -> Self {
        Self {
            id: db.id,
            subject: db.subject,
            description: db.description,
            author: db.author,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// Query parameters for listing notes.
///
/// The window fields are spelled out rather than flattened from
/// [`ListParams`]: the query-string deserializer cannot parse numbers or
/// booleans through a flattened struct.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListNotesQuery {
    /// Offset of the first row to return (default: 0)
    pub start: Option<i64>,
    /// Exclusive upper bound on row positions
    pub end: Option<i64>,
    /// Sort ascending (default: true)
    pub asc: Option<bool>,
    /// Column to sort by (default: "id")
    pub sort_by: Option<String>,
    /// Only rows created at or after this RFC 3339 timestamp
    pub from: Option<String>,
    /// Only rows created strictly before this RFC 3339 timestamp
    pub to: Option<String>,
    /// Only notes written by the given user
    pub author: Option<UserId>,
    /// Only notes attached to the given library
    pub library: Option<LibraryId>,
}

impl ListNotesQuery {
    /// Normalize into a repository filter. A library id from the path takes
    /// precedence over one in the query string.
    ///
    /// ```
    /// use lbnctl::api::models::notes::ListNotesQuery;
    ///
    /// let query: ListNotesQuery = serde_urlencoded::from_str("start=5&asc=false&library=2").unwrap();
    /// let filter = query.normalize(None).unwrap();
    /// assert_eq!(filter.window.start, 5);
    /// assert!(!filter.window.ascending);
    /// assert_eq!(filter.library, Some(2));
    /// ```
    pub fn normalize(&self, scope: Option<LibraryId>) -> Result<NoteFilter> {
        let params = ListParams {
            start: self.start,
            end: self.end,
            asc: self.asc,
            sort_by: self.sort_by.clone(),
            from: self.from.clone(),
            to: self.to.clone(),
        };
        Ok(NoteFilter {
            window: params.normalize(SORTABLE)?,
            author: self.author,
            library: scope.or(self.library),
        })
    }
}
