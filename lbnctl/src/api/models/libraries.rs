//! API request/response models for libraries.

use super::query::ListParams;
use crate::db::handlers::libraries::{LibraryFilter, SORTABLE};
use crate::db::models::libraries::{LibraryDBResponse, LibraryIpDBResponse};
use crate::errors::Result;
use crate::types::LibraryId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LibraryCreate {
    pub name: String,
    pub physical_address: Option<String>,
    pub shipping_address: Option<String>,
    pub timezone: Option<String>,
    pub coordinates: Option<String>,
    pub primary_contact_name: Option<String>,
    pub primary_contact_email: Option<String>,
    pub it_contact_name: Option<String>,
    pub it_contact_email: Option<String>,
    pub opening_hours: Option<String>,
    pub network_name: Option<String>,
    pub isp: Option<String>,
    pub contracted_speed_upload: Option<String>,
    pub contracted_speed_download: Option<String>,
    pub bandwidth_cap_upload: Option<String>,
    pub bandwidth_cap_download: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct LibraryUpdate {
    pub name: Option<String>,
    pub physical_address: Option<String>,
    pub shipping_address: Option<String>,
    pub timezone: Option<String>,
    pub coordinates: Option<String>,
    pub primary_contact_name: Option<String>,
    pub primary_contact_email: Option<String>,
    pub it_contact_name: Option<String>,
    pub it_contact_email: Option<String>,
    pub opening_hours: Option<String>,
    pub network_name: Option<String>,
    pub isp: Option<String>,
    pub contracted_speed_upload: Option<String>,
    pub contracted_speed_download: Option<String>,
    pub bandwidth_cap_upload: Option<String>,
    pub bandwidth_cap_download: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LibraryResponse {
    pub id: LibraryId,
    pub name: String,
    pub physical_address: Option<String>,
    pub shipping_address: Option<String>,
    pub timezone: Option<String>,
    pub coordinates: Option<String>,
    pub primary_contact_name: Option<String>,
    pub primary_contact_email: Option<String>,
    pub it_contact_name: Option<String>,
    pub it_contact_email: Option<String>,
    pub opening_hours: Option<String>,
    pub network_name: Option<String>,
    pub isp: Option<String>,
    pub contracted_speed_upload: Option<String>,
    pub contracted_speed_download: Option<String>,
    pub bandwidth_cap_upload: Option<String>,
    pub bandwidth_cap_download: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<LibraryDBResponse> for LibraryResponse {
    fn from(db: LibraryDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            physical_address: db.physical_address,
            shipping_address: db.shipping_address,
            timezone: db.timezone,
            coordinates: db.coordinates,
            primary_contact_name: db.primary_contact_name,
            primary_contact_email: db.primary_contact_email,
            it_contact_name: db.it_contact_name,
            it_contact_email: db.it_contact_email,
            opening_hours: db.opening_hours,
            network_name: db.network_name,
            isp: db.isp,
            contracted_speed_upload: db.contracted_speed_upload,
            contracted_speed_download: db.contracted_speed_download,
            bandwidth_cap_upload: db.bandwidth_cap_upload,
            bandwidth_cap_download: db.bandwidth_cap_download,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// One allowlisted address of a library
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LibraryIpResponse {
    pub lid: LibraryId,
    pub ip: String,
}

impl From<LibraryIpDBResponse> for LibraryIpResponse {
    fn from(db: LibraryIpDBResponse) -> Self {
        Self { lid: db.lid, ip: db.ip }
    }
}

/// Query parameters for listing libraries.
///
/// The window fields are spelled out rather than flattened from
/// [`ListParams`]: the query-string deserializer cannot parse numbers or
/// booleans through a flattened struct.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListLibrariesQuery {
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
    /// Only libraries the given user is a member of
    pub of_user: Option<i64>,
}

impl ListLibrariesQuery {
    pub fn normalize(&self) -> Result<LibraryFilter> {
        let params = ListParams {
            start: self.start,
            end: self.end,
            asc: self.asc,
            sort_by: self.sort_by.clone(),
            from: self.from.clone(),
            to: self.to.clone(),
        };
        Ok(LibraryFilter {
            window: params.normalize(SORTABLE)?,
            of_user: self.of_user,
        })
    }
}
