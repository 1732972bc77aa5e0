use crate::db::errors::DbError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Authentication required but not provided
    #[error("Not authenticated")]
    Unauthenticated { message: Option<String> },

    /// Invalid request data or malformed query parameters
    #[error("{message}")]
    BadRequest { message: String },

    /// Schema-valid transport but semantically unusable payload
    #[error("{message}")]
    Unprocessable { message: String },

    /// Requested resource not found
    #[error("{resource} with ID {id} does not exist")]
    NotFound { resource: String, id: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Database operation error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::Unprocessable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Database(db_err) => match db_err {
                DbError::NotFound => StatusCode::NOT_FOUND,
                DbError::UniqueViolation { .. } => StatusCode::CONFLICT,
                DbError::ForeignKeyViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::CheckViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::Unprocessable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Unauthenticated { message } => message.clone().unwrap_or_else(|| "Authentication required".to_string()),
            Error::BadRequest { message } => message.clone(),
            Error::Unprocessable { message } => message.clone(),
            Error::NotFound { resource, id } => {
                format!("{resource} with ID {id} does not exist")
            }
            Error::Internal { .. } => "Internal server error".to_string(),
            Error::Database(db_err) => match db_err {
                DbError::NotFound => "Resource not found".to_string(),
                DbError::UniqueViolation { message, .. } => {
                    // sqlite reports the offending column path, which is safe to surface
                    format!("Resource already exists: {message}")
                }
                DbError::ForeignKeyViolation { .. } => "Invalid reference to related resource".to_string(),
                DbError::CheckViolation { .. } => "Invalid data provided".to_string(),
                DbError::Unprocessable { message } => message.clone(),
                DbError::Other(_) => "Database error occurred".to_string(),
            },
            Error::Other(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Database(DbError::Other(_)) | Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Database(_) => {
                tracing::warn!("Database constraint error: {}", self);
            }
            Error::Unauthenticated { .. } => {
                tracing::info!("Authorization error: {}", self);
            }
            Error::BadRequest { .. } | Error::Unprocessable { .. } | Error::NotFound { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();

        // Every error leaves the boundary in the envelope shape, with a
        // human-readable message in place of the data payload.
        let body = json!({
            "statusCode": status.as_u16(),
            "status": "error",
            "message": self.user_message(),
        });

        (status, axum::response::Json(body)).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let err = Error::BadRequest {
            message: "bad".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err = Error::NotFound {
            resource: "Library".to_string(),
            id: "7".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let err = Error::Unauthenticated { message: None };
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);

        let err = Error::Database(DbError::NotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let err = Error::Database(DbError::Unprocessable {
            message: "need an identity".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        // Unexpected store failures are server faults, not client faults
        let err = Error::Database(DbError::Other(anyhow::anyhow!("disk on fire")));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_user_message_hides_internals() {
        let err = Error::Database(DbError::Other(anyhow::anyhow!("secret pool state")));
        assert_eq!(err.user_message(), "Database error occurred");

        let err = Error::Internal {
            operation: "rotate the frobnicator".to_string(),
        };
        assert_eq!(err.user_message(), "Internal server error");
    }

    #[test]
    fn test_not_found_message_names_resource() {
        let err = Error::NotFound {
            resource: "Note".to_string(),
            id: "42".to_string(),
        };
        assert_eq!(err.user_message(), "Note with ID 42 does not exist");
    }
}
