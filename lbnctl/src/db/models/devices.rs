//! Database models for measurement devices.

use crate::api::models::devices::{DeviceCreate, DeviceUpdate};
use crate::types::DeviceId;
use chrono::{DateTime, Utc};

/// Database request for creating a new device
#[derive(Debug, Clone)]
pub struct DeviceCreateDBRequest {
    pub name: String,
    pub network_type: Option<String>,
    pub connection_type: Option<String>,
    pub dns_server: Option<String>,
    pub ip: Option<String>,
    pub gateway: Option<String>,
    pub mac: Option<String>,
    pub deviceid: String,
}

impl From<DeviceCreate> for DeviceCreateDBRequest {
    fn from(api: DeviceCreate) -> Self {
        Self {
            name: api.name,
            network_type: api.network_type,
            connection_type: api.connection_type,
            dns_server: api.dns_server,
            ip: api.ip,
            gateway: api.gateway,
            mac: api.mac,
            deviceid: api.deviceid,
        }
    }
}

/// Database request for a partial device update
#[derive(Debug, Clone, Default)]
pub struct DeviceUpdateDBRequest {
    pub name: Option<String>,
    pub network_type: Option<String>,
    pub connection_type: Option<String>,
    pub dns_server: Option<String>,
    pub ip: Option<String>,
    pub gateway: Option<String>,
    pub mac: Option<String>,
    pub deviceid: Option<String>,
}

impl From<DeviceUpdate> for DeviceUpdateDBRequest {
    fn from(api: DeviceUpdate) -> Self {
        Self {
            name: api.name,
            network_type: api.network_type,
            connection_type: api.connection_type,
            dns_server: api.dns_server,
            ip: api.ip,
            gateway: api.gateway,
            mac: api.mac,
            deviceid: api.deviceid,
        }
    }
}

/// Database response for a device
#[derive(Debug, Clone)]
pub struct DeviceDBResponse {
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
