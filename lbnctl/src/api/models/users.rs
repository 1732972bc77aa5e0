//! API request/response models for users.

use super::query::ListParams;
use crate::db::handlers::users::{UserFilter, SORTABLE};
use crate::db::models::users::UserDBResponse;
use crate::errors::Result;
use crate::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserCreate {
    pub username: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub location: Option<String>,
    pub role: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub location: Option<String>,
    pub role: Option<i64>,
}

/// User as returned by the API. The password hash never appears here.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: UserId,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub location: Option<String>,
    pub role: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserDBResponse> for UserResponse {
    fn from(db: UserDBResponse) -> Self {
        Self {
            id: db.id,
            username: db.username,
            first_name: db.first_name,
            last_name: db.last_name,
            email: db.email,
            location: db.location,
            role: db.role,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// The authenticated caller, as reconstructed from the session token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CurrentUser {
    pub id: UserId,
    pub username: String,
    pub role: Option<i64>,
}

impl From<UserDBResponse> for CurrentUser {
    fn from(db: UserDBResponse) -> Self {
        Self {
            id: db.id,
            username: db.username,
            role: db.role,
        }
    }
}

/// Query parameters for listing users.
///
/// The window fields are spelled out rather than flattened from
/// [`ListParams`]: the query-string deserializer cannot parse numbers or
/// booleans through a flattened struct.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListUsersQuery {
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
}

impl ListUsersQuery {
    pub fn normalize(&self) -> Result<UserFilter> {
        let params = ListParams {
            start: self.start,
            end: self.end,
            asc: self.asc,
            sort_by: self.sort_by.clone(),
            from: self.from.clone(),
            to: self.to.clone(),
        };
        Ok(UserFilter {
            window: params.normalize(SORTABLE)?,
        })
    }
}
