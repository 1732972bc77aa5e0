//! Database models for users.

use crate::api::models::users::UserCreate;
use crate::types::UserId;
use chrono::{DateTime, Utc};

/// Database request for creating a new user.
///
/// The password arrives here already hashed; handlers own the argon2 step so
/// plaintext never crosses the repository boundary.
#[derive(Debug, Clone)]
pub struct UserCreateDBRequest {
    pub username: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub location: Option<String>,
    pub role: Option<i64>,
}

impl UserCreateDBRequest {
    pub fn new(api: UserCreate, password_hash: String) -> Self {
        Self {
            username: api.username,
            password_hash,
            first_name: api.first_name,
            last_name: api.last_name,
            email: api.email,
            location: api.location,
            role: api.role,
        }
    }
}

/// Database request for a partial user update
#[derive(Debug, Clone, Default)]
pub struct UserUpdateDBRequest {
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub location: Option<String>,
    pub role: Option<i64>,
}

/// Database response for a user.
///
/// Carries the password hash for credential verification during login; the
/// API response type drops it before anything leaves the process.
#[derive(Debug, Clone)]
pub struct UserDBResponse {
    pub id: UserId,
    pub username: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub location: Option<String>,
    pub role: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
