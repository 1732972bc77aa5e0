//! Uniform success envelope wrapped around every API response body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Envelope status discriminator. The error variant is produced by
/// [`crate::errors::Error`] at the response boundary, never constructed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeStatus {
    Ok,
    Created,
}

/// `{ statusCode, status, data }` wrapper returned by every successful
/// endpoint that carries a body.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T> {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub status: EnvelopeStatus,
    pub data: T,
}

impl<T: Serialize> Envelope<T> {
    /// 200 envelope for successful reads.
    pub fn ok(data: T) -> Self {
        Self {
            status_code: StatusCode::OK.as_u16(),
            status: EnvelopeStatus::Ok,
            data,
        }
    }

    /// 201 envelope for successful creation.
    pub fn created(data: T) -> Self {
        Self {
            status_code: StatusCode::CREATED.as_u16(),
            status: EnvelopeStatus::Created,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        // status_code is only ever set from the constructors above
        let status = StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ok_envelope_shape() {
        let envelope = Envelope::ok(vec![json!({"id": 1})]);
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            value,
            json!({
                "statusCode": 200,
                "status": "ok",
                "data": [{"id": 1}],
            })
        );
    }

    #[test]
    fn test_created_envelope_shape() {
        let envelope = Envelope::created(json!({"id": 7}));
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["statusCode"], 201);
        assert_eq!(value["status"], "created");
        assert_eq!(value["data"]["id"], 7);
    }
}
