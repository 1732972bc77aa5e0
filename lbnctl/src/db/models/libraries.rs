//! Database models for libraries and their IP allowlist.

use crate::api::models::libraries::{LibraryCreate, LibraryUpdate};
use crate::types::LibraryId;
use chrono::{DateTime, Utc};

/// Database request for creating a new library
#[derive(Debug, Clone)]
pub struct LibraryCreateDBRequest {
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

impl From<LibraryCreate> for LibraryCreateDBRequest {
    fn from(api: LibraryCreate) -> Self {
        Self {
            name: api.name,
            physical_address: api.physical_address,
            shipping_address: api.shipping_address,
            timezone: api.timezone,
            coordinates: api.coordinates,
            primary_contact_name: api.primary_contact_name,
            primary_contact_email: api.primary_contact_email,
            it_contact_name: api.it_contact_name,
            it_contact_email: api.it_contact_email,
            opening_hours: api.opening_hours,
            network_name: api.network_name,
            isp: api.isp,
            contracted_speed_upload: api.contracted_speed_upload,
            contracted_speed_download: api.contracted_speed_download,
            bandwidth_cap_upload: api.bandwidth_cap_upload,
            bandwidth_cap_download: api.bandwidth_cap_download,
        }
    }
}

/// Database request for a partial library update
#[derive(Debug, Clone, Default)]
pub struct LibraryUpdateDBRequest {
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

impl From<LibraryUpdate> for LibraryUpdateDBRequest {
    fn from(api: LibraryUpdate) -> Self {
        Self {
            name: api.name,
            physical_address: api.physical_address,
            shipping_address: api.shipping_address,
            timezone: api.timezone,
            coordinates: api.coordinates,
            primary_contact_name: api.primary_contact_name,
            primary_contact_email: api.primary_contact_email,
            it_contact_name: api.it_contact_name,
            it_contact_email: api.it_contact_email,
            opening_hours: api.opening_hours,
            network_name: api.network_name,
            isp: api.isp,
            contracted_speed_upload: api.contracted_speed_upload,
            contracted_speed_download: api.contracted_speed_download,
            bandwidth_cap_upload: api.bandwidth_cap_upload,
            bandwidth_cap_download: api.bandwidth_cap_download,
        }
    }
}

/// Database response for a library
#[derive(Debug, Clone)]
pub struct LibraryDBResponse {
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

/// Database response for an IP allowlist row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryIpDBResponse {
    pub lid: LibraryId,
    pub ip: String,
}
