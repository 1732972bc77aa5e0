//! API request/response models for measurement devices.

use super::query::ListParams;
use crate::db::handlers::devices::{DeviceFilter, SORTABLE};
use crate::db::models::devices::DeviceDBResponse;
use crate::errors::Result;
use crate::types::{DeviceId, LibraryId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeviceCreate {
    pub name: String,
    pub network_type: Option<String>,
    pub connection_type: Option<String>,
    pub dns_server: Option<String>,
    pub ip: Option<String>,
    pub gateway: Option<String>,
    pub mac: Option<String>,
    /// Stable external identifier burned into the device image
    pub deviceid: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct DeviceUpdate {
    pub name: Option<String>,
    pub network_type: Option<String>,
    pub connection_type: Option<String>,
    pub dns_server: Option<String>,
    pub ip: Option<String>,
    pub gateway: Option<String>,
    pub mac: Option<String>,
    pub deviceid: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeviceResponse {
    pub id: DeviceId,
    pub name: Option<String>,
    pub network_type: Option<String>,
    pub connection_type: Option<String>,
    pub dns_server: Option<String>,
    pub ip: Option<String>,
    pub gateway: Option<String>,
    pub mac: Option<String>,
    pub deviceid: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DeviceDBResponse> for DeviceResponse {
    fn from(db: DeviceDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            network_type: db.network_type,
            connection_type: db.connection_type,
            dns_server: db.dns_server,
            ip: db.ip,
            gateway: db.gateway,
            mac: db.mac,
            deviceid: db.deviceid,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// Query parameters for listing devices.
///
/// The window fields are spelled out rather than flattened from
/// [`ListParams`]: the query-string deserializer cannot parse numbers or
/// booleans through a flattened struct.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListDevicesQuery {
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
    /// Only devices installed at the given library
    pub library: Option<LibraryId>,
}

impl ListDevicesQuery {
    /// Normalize into a repository filter. A library id from the path takes
    /// precedence over one in the query string.
    pub fn normalize(&self, scope: Option<LibraryId>) -> Result<DeviceFilter> {
        let params = ListParams {
            start: self.start,
            end: self.end,
            asc: self.asc,
            sort_by: self.sort_by.clone(),
            from: self.from.clone(),
            to: self.to.clone(),
        };
        Ok(DeviceFilter {
            window: params.normalize(SORTABLE)?,
            library: scope.or(self.library),
        })
    }
}
