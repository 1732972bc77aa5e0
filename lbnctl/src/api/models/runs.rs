//! API request/response models for measurement runs.

use super::query::ListParams;
use crate::db::handlers::runs::{RunFilter, SORTABLE};
use crate::db::models::runs::RunDBResponse;
use crate::errors::Result;
use crate::types::{LibraryId, RunId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RunCreate {
    /// Which test produced this run (e.g. "ndt7")
    pub test: String,
    /// Raw result payload as uploaded by the measurement client
    #[schema(value_type = Object)]
    pub result: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct RunUpdate {
    pub test: Option<String>,
    #[schema(value_type = Object)]
    pub result: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RunResponse {
    pub id: RunId,
    pub test: String,
    #[schema(value_type = Object)]
    pub result: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<RunDBResponse> for RunResponse {
    fn from(db: RunDBResponse) -> Self {
        Self {
            id: db.id,
            test: db.test,
            result: db.result,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// Query parameters for listing runs.
///
/// The window fields are spelled out rather than flattened from
/// [`ListParams`]: the query-string deserializer cannot parse numbers or
/// booleans through a flattened struct.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListRunsQuery {
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
    /// Only runs of the given test type
    pub test: Option<String>,
    /// Only runs attached to the given library
    pub library: Option<LibraryId>,
}

impl ListRunsQuery {
    /// Normalize into a repository filter. A library id from the path takes
    /// precedence over one in the query string.
    pub fn normalize(&self, scope: Option<LibraryId>) -> Result<RunFilter> {
        let params = ListParams {
            start: self.start,
            end: self.end,
            asc: self.asc,
            sort_by: self.sort_by.clone(),
            from: self.from.clone(),
            to: self.to.clone(),
        };
        Ok(RunFilter {
            window: params.normalize(SORTABLE)?,
            test: self.test.clone(),
            library: scope.or(self.library),
        })
    }
}
