//! API models for the authentication endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    /// Keep the session cookie beyond the browser session
    #[serde(default)]
    pub remember: bool,
}
