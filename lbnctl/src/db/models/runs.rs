//! Database models for measurement runs.
//!
//! The result payload is schemaless JSON produced by the measurement client;
//! it is stored as text and parsed back on the way out.

use crate::api::models::runs::{RunCreate, RunUpdate};
use crate::types::RunId;
use chrono::{DateTime, Utc};

/// Database request for creating a new run
#[derive(Debug, Clone)]
pub struct RunCreateDBRequest {
    pub test: String,
    pub result: Option<String>,
}

impl From<RunCreate> for RunCreateDBRequest {
    fn from(api: RunCreate) -> Self {
        Self {
            test: api.test,
            result: api.result.as_ref().map(|v| v.to_string()),
        }
    }
}

/// Database request for a partial run update
#[derive(Debug, Clone, Default)]
pub struct RunUpdateDBRequest {
    pub test: Option<String>,
    pub result: Option<String>,
}

impl From<RunUpdate> for RunUpdateDBRequest {
    fn from(api: RunUpdate) -> Self {
        Self {
            test: api.test,
            result: api.result.as_ref().map(|v| v.to_string()),
        }
    }
}

/// Database response for a run
#[derive(Debug, Clone)]
pub struct RunDBResponse {
    pub id: RunId,
    pub test: String,
    pub result: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
