//! Database repository for measurement devices and their library associations.

use crate::api::models::query::Window;
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::{Repository, UpdateOutcome},
    models::devices::{DeviceCreateDBRequest, DeviceDBResponse, DeviceUpdateDBRequest},
};
use crate::types::{DeviceId, LibraryId};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection};
use tracing::instrument;

/// Columns a device listing may be ordered by
pub const SORTABLE: &[&str] = &["id", "name", "deviceid", "connection_type", "created_at", "updated_at"];

/// Filter for listing devices
#[derive(Debug, Clone, Default)]
pub struct DeviceFilter {
    pub window: Window,
    pub library: Option<LibraryId>,
}

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct Device {
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

impl From<Device> for DeviceDBResponse {
    fn from(device: Device) -> Self {
        Self {
            id: device.id,
            name: device.name,
            network_type: device.network_type,
            connection_type: device.connection_type,
            dns_server: device.dns_server,
            ip: device.ip,
            gateway: device.gateway,
            mac: device.mac,
            deviceid: device.deviceid,
            created_at: device.created_at,
            updated_at: device.updated_at,
        }
    }
}

pub struct Devices<'c> {
    db: &'c mut SqliteConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Devices<'c> {
    type CreateRequest = DeviceCreateDBRequest;
    type UpdateRequest = DeviceUpdateDBRequest;
    type Response = DeviceDBResponse;
    type Id = DeviceId;
    type Filter = DeviceFilter;

    #[instrument(skip(self, request), fields(deviceid = %request.deviceid), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        self.create_scoped(request, None).await
    }

    #[instrument(skip(self), fields(device_id = id), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let device = sqlx::query_as::<_, Device>("SELECT * FROM devices WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(device.map(DeviceDBResponse::from))
    }

    #[instrument(skip(self, filter), fields(start = filter.window.start, library = filter.library), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT devices.* FROM devices");

        if let Some(lid) = filter.library {
            query.push(" JOIN library_devices ON library_devices.did = devices.id AND library_devices.lid = ");
            query.push_bind(lid);
        }

        query.push(" WHERE 1=1");
        filter.window.push_time_bounds(&mut query, "devices");
        filter.window.push_order_and_slice(&mut query, "devices");

        let devices = query.build_query_as::<Device>().fetch_all(&mut *self.db).await?;

        Ok(devices.into_iter().map(DeviceDBResponse::from).collect())
    }

    #[instrument(skip(self, request), fields(device_id = id), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<UpdateOutcome<Self::Response>> {
        let result = sqlx::query(
            r#"
            UPDATE devices SET
                name = COALESCE(?, name),
                network_type = COALESCE(?, network_type),
                connection_type = COALESCE(?, connection_type),
                dns_server = COALESCE(?, dns_server),
                ip = COALESCE(?, ip),
                gateway = COALESCE(?, gateway),
                mac = COALESCE(?, mac),
                deviceid = COALESCE(?, deviceid)
            WHERE id = ?
            "#,
        )
        .bind(&request.name)
        .bind(&request.network_type)
        .bind(&request.connection_type)
        .bind(&request.dns_server)
        .bind(&request.ip)
        .bind(&request.gateway)
        .bind(&request.mac)
        .bind(&request.deviceid)
        .bind(id)
        .execute(&mut *self.db)
        .await?;

        if result.rows_affected() > 0 {
            let row = self.fetch_existing(id).await?;
            return Ok(UpdateOutcome { existed: true, row });
        }

        let deviceid = request.deviceid.clone().ok_or_else(|| DbError::Unprocessable {
            message: "Cannot create a device without a device identifier.".to_string(),
        })?;

        sqlx::query(
            r#"
            INSERT INTO devices (id, name, network_type, connection_type, dns_server, ip, gateway, mac, deviceid)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(&request.name)
        .bind(&request.network_type)
        .bind(&request.connection_type)
        .bind(&request.dns_server)
        .bind(&request.ip)
        .bind(&request.gateway)
        .bind(&request.mac)
        .bind(&deviceid)
        .execute(&mut *self.db)
        .await?;

        let row = self.fetch_existing(id).await?;
        Ok(UpdateOutcome { existed: false, row })
    }

    #[instrument(skip(self), fields(device_id = id), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM devices WHERE id = ?")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

impl<'c> Devices<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    async fn fetch_existing(&mut self, id: DeviceId) -> Result<DeviceDBResponse> {
        let device = sqlx::query_as::<_, Device>("SELECT * FROM devices WHERE id = ?")
            .bind(id)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(DeviceDBResponse::from(device))
    }

    /// Create a device, optionally attaching it to a library.
    #[instrument(skip(self, request), fields(deviceid = %request.deviceid, library_id = lid), err)]
    pub async fn create_scoped(&mut self, request: &DeviceCreateDBRequest, lid: Option<LibraryId>) -> Result<DeviceDBResponse> {
        let result = sqlx::query(
            r#"
            INSERT INTO devices (name, network_type, connection_type, dns_server, ip, gateway, mac, deviceid)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&request.name)
        .bind(&request.network_type)
        .bind(&request.connection_type)
        .bind(&request.dns_server)
        .bind(&request.ip)
        .bind(&request.gateway)
        .bind(&request.mac)
        .bind(&request.deviceid)
        .execute(&mut *self.db)
        .await?;

        let id = result.last_insert_rowid();
        if let Some(lid) = lid {
            self.add_to_library(lid, id).await?;
        }

        self.fetch_existing(id).await
    }

    /// Exact-identity lookup, optionally restricted to devices installed at
    /// a library. A device outside the library reads as absent.
    #[instrument(skip(self), fields(device_id = id, library_id = lid), err)]
    pub async fn get_scoped(&mut self, id: DeviceId, lid: Option<LibraryId>) -> Result<Option<DeviceDBResponse>> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT devices.* FROM devices");
        if let Some(lid) = lid {
            query.push(" JOIN library_devices ON library_devices.did = devices.id AND library_devices.lid = ");
            query.push_bind(lid);
        }
        query.push(" WHERE devices.id = ");
        query.push_bind(id);

        let device = query.build_query_as::<Device>().fetch_optional(&mut *self.db).await?;

        Ok(device.map(DeviceDBResponse::from))
    }

    /// Attach an existing device to a library.
    #[instrument(skip(self), fields(library_id = lid, device_id = id), err)]
    pub async fn add_to_library(&mut self, lid: LibraryId, id: DeviceId) -> Result<()> {
        match sqlx::query("INSERT INTO library_devices (lid, did) VALUES (?, ?) ON CONFLICT DO NOTHING")
            .bind(lid)
            .bind(id)
            .execute(&mut *self.db)
            .await
        {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => {
                // Either the library or the device does not exist
                Err(DbError::NotFound)
            }
            Err(e) => Err(DbError::from(e)),
        }
    }

    /// Detach a device from a library, reporting how many join rows went away.
    #[instrument(skip(self), fields(library_id = lid, device_id = id), err)]
    pub async fn remove_from_library(&mut self, lid: LibraryId, id: DeviceId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM library_devices WHERE lid = ? AND did = ?")
            .bind(lid)
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_library;
    use sqlx::SqlitePool;

    fn tagged(deviceid: &str) -> DeviceCreateDBRequest {
        DeviceCreateDBRequest {
            name: format!("probe-{deviceid}"),
            network_type: Some("wired".to_string()),
            connection_type: Some("ethernet".to_string()),
            dns_server: None,
            ip: None,
            gateway: None,
            mac: None,
            deviceid: deviceid.to_string(),
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_and_get_round_trip(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Devices::new(&mut conn);

        let created = repo.create(&tagged("odroid-001")).await.unwrap();
        let fetched = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.deviceid.as_deref(), Some("odroid-001"));
        assert_eq!(fetched.name.as_deref(), Some("probe-odroid-001"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_deviceid_unique_across_system(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Devices::new(&mut conn);

        repo.create(&tagged("odroid-001")).await.unwrap();
        let err = repo.create(&tagged("odroid-001")).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_library_scoping(pool: SqlitePool) {
        let lid = create_test_library(&pool, "Main").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Devices::new(&mut conn);

        let attached = repo.create_scoped(&tagged("odroid-001"), Some(lid)).await.unwrap();
        repo.create(&tagged("odroid-002")).await.unwrap();

        let rows = repo
            .list(&DeviceFilter {
                library: Some(lid),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, attached.id);

        assert_eq!(repo.remove_from_library(lid, attached.id).await.unwrap(), 1);
        let rows = repo
            .list(&DeviceFilter {
                library: Some(lid),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_outcome(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Devices::new(&mut conn);

        let created = repo.create(&tagged("odroid-001")).await.unwrap();
        let outcome = repo
            .update(
                created.id,
                &DeviceUpdateDBRequest {
                    connection_type: Some("wifi".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(outcome.existed);
        assert_eq!(outcome.row.connection_type.as_deref(), Some("wifi"));
        assert_eq!(outcome.row.deviceid.as_deref(), Some("odroid-001"));

        // Missing identity with enough payload materializes the row
        let outcome = repo
            .update(
                500,
                &DeviceUpdateDBRequest {
                    deviceid: Some("odroid-500".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(!outcome.existed);
        assert_eq!(outcome.row.id, 500);

        // Missing identity without one is refused
        let err = repo.update(501, &DeviceUpdateDBRequest::default()).await.unwrap_err();
        assert!(matches!(err, DbError::Unprocessable { .. }));
    }
}
