//! Shared list-query types for API query parameters.
//!
//! Every collection endpoint accepts the same window parameters (`start`,
//! `end`, `asc`, `sort_by`, `from`, `to`) plus entity-specific filters. The
//! raw parameters arrive as loosely-typed strings; [`ListParams::normalize`]
//! turns them into a [`Window`] descriptor or rejects them with a validation
//! error. Repositories consume the descriptor when building their queries.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite};
use utoipa::{IntoParams, ToSchema};

use crate::errors::{Error, Result};

/// Raw window parameters as they appear in a query string.
///
/// All fields are optional; `normalize` applies the defaults (`start = 0`,
/// ascending by `id`) and enforces the range and type constraints.
#[derive(Debug, Default, Clone, Deserialize, IntoParams, ToSchema)]
pub struct ListParams {
    /// Offset of the first row to return (default: 0)
    #[param(default = 0, minimum = 0)]
    pub start: Option<i64>,

    /// Exclusive upper bound on row positions; `end - start` rows are returned
    #[param(minimum = 1)]
    pub end: Option<i64>,

    /// Sort ascending (default: true)
    pub asc: Option<bool>,

    /// Column to sort by (default: "id")
    pub sort_by: Option<String>,

    /// Only rows created at or after this RFC 3339 timestamp
    pub from: Option<String>,

    /// Only rows created strictly before this RFC 3339 timestamp
    pub to: Option<String>,
}

impl ListParams {
    /// Normalize the raw parameters into a [`Window`], validating every field.
    ///
    /// `sortable` is the entity's allowlist of sortable columns; the sort
    /// field is interpolated into ORDER BY and must never come straight from
    /// the request.
    pub fn normalize(&self, sortable: &[&str]) -> Result<Window> {
        let start = self.start.unwrap_or(0);
        if start < 0 {
            return Err(Error::BadRequest {
                message: "start must be a non-negative integer".to_string(),
            });
        }

        if let Some(end) = self.end {
            if end <= 0 {
                return Err(Error::BadRequest {
                    message: "end must be a positive integer".to_string(),
                });
            }
        }

        let sort_field = self.sort_by.clone().unwrap_or_else(|| "id".to_string());
        if !sortable.contains(&sort_field.as_str()) {
            return Err(Error::BadRequest {
                message: format!("cannot sort by unknown field '{sort_field}'"),
            });
        }

        let from = self.from.as_deref().map(parse_timestamp).transpose()?;
        let to = self.to.as_deref().map(parse_timestamp).transpose()?;

        Ok(Window {
            start,
            end: self.end,
            ascending: self.asc.unwrap_or(true),
            sort_field,
            from,
            to,
        })
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| Error::BadRequest {
            message: "Invalid timestamp value.".to_string(),
        })
}

/// Normalized filter/pagination/sort descriptor for collection queries.
///
/// Produced exclusively by [`ListParams::normalize`], so the sort field is
/// guaranteed to be a known column name by the time a repository sees it.
#[derive(Debug, Clone)]
pub struct Window {
    pub start: i64,
    pub end: Option<i64>,
    pub ascending: bool,
    pub sort_field: String,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl Default for Window {
    fn default() -> Self {
        Self {
            start: 0,
            end: None,
            ascending: true,
            sort_field: "id".to_string(),
            from: None,
            to: None,
        }
    }
}

impl Window {
    /// Row budget derived from the offsets: only meaningful when `end > start`.
    pub fn limit(&self) -> Option<i64> {
        self.end.filter(|end| *end > self.start).map(|end| end - self.start)
    }

    /// Append the creation-timestamp bounds to a query.
    ///
    /// `from` is inclusive and `to` exclusive, so adjacent windows tile
    /// without overlap. Both sides go through sqlite's datetime() to make the
    /// comparison independent of the stored text format. Expects the query to
    /// already be inside a WHERE clause.
    pub fn push_time_bounds(&self, query: &mut QueryBuilder<'_, Sqlite>, table: &str) {
        if let Some(from) = self.from {
            query.push(format!(" AND datetime({table}.created_at) >= datetime("));
            query.push_bind(from.to_rfc3339());
            query.push(")");
        }

        if let Some(to) = self.to {
            query.push(format!(" AND datetime({table}.created_at) < datetime("));
            query.push_bind(to.to_rfc3339());
            query.push(")");
        }
    }

    /// Append ORDER BY / LIMIT / OFFSET to a query.
    ///
    /// Ties on the sort column are broken by `id ASC` so the ordering is
    /// stable across pages. Offset and limit are independent: `start` alone
    /// returns all remaining rows (sqlite needs the `LIMIT -1` placeholder to
    /// accept a bare OFFSET), `end` alone limits from position zero.
    pub fn push_order_and_slice(&self, query: &mut QueryBuilder<'_, Sqlite>, table: &str) {
        let direction = if self.ascending { "ASC" } else { "DESC" };
        query.push(format!(
            " ORDER BY {table}.{sort} {direction}, {table}.id ASC",
            sort = self.sort_field
        ));

        if let Some(limit) = self.limit() {
            query.push(" LIMIT ");
            query.push_bind(limit);
        } else if self.start > 0 {
            query.push(" LIMIT -1");
        }

        if self.start > 0 {
            query.push(" OFFSET ");
            query.push_bind(self.start);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SORTABLE: &[&str] = &["id", "name", "created_at", "updated_at"];

    #[test]
    fn test_defaults() {
        let window = ListParams::default().normalize(SORTABLE).unwrap();
        assert_eq!(window.start, 0);
        assert_eq!(window.end, None);
        assert!(window.ascending);
        assert_eq!(window.sort_field, "id");
        assert_eq!(window.from, None);
        assert_eq!(window.to, None);
    }

    #[test]
    fn test_negative_start_rejected() {
        let params = ListParams {
            start: Some(-1),
            ..Default::default()
        };
        let err = params.normalize(SORTABLE).unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_non_positive_end_rejected() {
        for end in [0, -3] {
            let params = ListParams {
                end: Some(end),
                ..Default::default()
            };
            assert!(params.normalize(SORTABLE).is_err(), "end = {end} should be rejected");
        }
    }

    #[test]
    fn test_unknown_sort_field_rejected() {
        let params = ListParams {
            sort_by: Some("password; DROP TABLE users".to_string()),
            ..Default::default()
        };
        assert!(params.normalize(SORTABLE).is_err());
    }

    #[test]
    fn test_known_sort_field_accepted() {
        let params = ListParams {
            sort_by: Some("name".to_string()),
            asc: Some(false),
            ..Default::default()
        };
        let window = params.normalize(SORTABLE).unwrap();
        assert_eq!(window.sort_field, "name");
        assert!(!window.ascending);
    }

    #[test]
    fn test_invalid_timestamp_rejected() {
        let params = ListParams {
            from: Some("not-a-date".to_string()),
            ..Default::default()
        };
        let err = params.normalize(SORTABLE).unwrap_err();
        assert_eq!(err.user_message(), "Invalid timestamp value.");

        let params = ListParams {
            to: Some("2024-13-45T99:00:00Z".to_string()),
            ..Default::default()
        };
        assert!(params.normalize(SORTABLE).is_err());
    }

    #[test]
    fn test_valid_timestamps_parsed() {
        let params = ListParams {
            from: Some("2024-01-01T00:00:00Z".to_string()),
            to: Some("2024-02-01T12:30:00+02:00".to_string()),
            ..Default::default()
        };
        let window = params.normalize(SORTABLE).unwrap();
        assert_eq!(window.from.unwrap().to_rfc3339(), "2024-01-01T00:00:00+00:00");
        // Offsets are normalized to UTC
        assert_eq!(window.to.unwrap().to_rfc3339(), "2024-02-01T10:30:00+00:00");
    }

    #[test]
    fn test_limit_only_when_end_exceeds_start() {
        let mut window = Window::default();
        assert_eq!(window.limit(), None);

        // end alone limits from position zero
        window.end = Some(10);
        assert_eq!(window.limit(), Some(10));

        window.start = 4;
        assert_eq!(window.limit(), Some(6));

        // end <= start yields no limit
        window.start = 10;
        assert_eq!(window.limit(), None);
        window.start = 15;
        assert_eq!(window.limit(), None);
    }

    #[test]
    fn test_order_and_slice_sql() {
        let window = Window {
            start: 5,
            end: Some(25),
            ascending: false,
            sort_field: "created_at".to_string(),
            from: None,
            to: None,
        };
        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM runs WHERE 1=1");
        window.push_order_and_slice(&mut query, "runs");
        let sql = query.sql();
        assert!(sql.contains("ORDER BY runs.created_at DESC, runs.id ASC"), "sql: {sql}");
        assert!(sql.contains("LIMIT"), "sql: {sql}");
        assert!(sql.contains("OFFSET"), "sql: {sql}");
    }

    #[test]
    fn test_offset_without_limit_keeps_query_valid() {
        let window = Window {
            start: 3,
            ..Default::default()
        };
        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM runs WHERE 1=1");
        window.push_order_and_slice(&mut query, "runs");
        let sql = query.sql();
        // sqlite rejects OFFSET without LIMIT, so the sentinel must be present
        assert!(sql.contains("LIMIT -1"), "sql: {sql}");
        assert!(sql.contains("OFFSET"), "sql: {sql}");
    }

    #[test]
    fn test_time_bounds_sql() {
        let params = ListParams {
            from: Some("2024-01-01T00:00:00Z".to_string()),
            to: Some("2024-06-01T00:00:00Z".to_string()),
            ..Default::default()
        };
        let window = params.normalize(SORTABLE).unwrap();
        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM notes WHERE 1=1");
        window.push_time_bounds(&mut query, "notes");
        let sql = query.sql();
        assert!(sql.contains("datetime(notes.created_at) >= datetime("), "sql: {sql}");
        assert!(sql.contains("datetime(notes.created_at) < datetime("), "sql: {sql}");
    }
}
