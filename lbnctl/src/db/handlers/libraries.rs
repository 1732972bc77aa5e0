//! Database repository for libraries, their IP allowlist, and memberships.

use crate::api::models::query::Window;
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::{Repository, UpdateOutcome},
    models::libraries::{LibraryCreateDBRequest, LibraryDBResponse, LibraryIpDBResponse, LibraryUpdateDBRequest},
};
use crate::types::{LibraryId, UserId};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection};
use tracing::instrument;

/// Columns a library listing may be ordered by
pub const SORTABLE: &[&str] = &["id", "name", "timezone", "isp", "created_at", "updated_at"];

/// Filter for listing libraries
#[derive(Debug, Clone, Default)]
pub struct LibraryFilter {
    pub window: Window,
    pub of_user: Option<UserId>,
}

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct Library {
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

impl From<Library> for LibraryDBResponse {
    fn from(library: Library) -> Self {
        Self {
            id: library.id,
            name: library.name,
            physical_address: library.physical_address,
            shipping_address: library.shipping_address,
            timezone: library.timezone,
            coordinates: library.coordinates,
            primary_contact_name: library.primary_contact_name,
            primary_contact_email: library.primary_contact_email,
            it_contact_name: library.it_contact_name,
            it_contact_email: library.it_contact_email,
            opening_hours: library.opening_hours,
            network_name: library.network_name,
            isp: library.isp,
            contracted_speed_upload: library.contracted_speed_upload,
            contracted_speed_download: library.contracted_speed_download,
            bandwidth_cap_upload: library.bandwidth_cap_upload,
            bandwidth_cap_download: library.bandwidth_cap_download,
            created_at: library.created_at,
            updated_at: library.updated_at,
        }
    }
}

pub struct Libraries<'c> {
    db: &'c mut SqliteConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Libraries<'c> {
    type CreateRequest = LibraryCreateDBRequest;
    type UpdateRequest = LibraryUpdateDBRequest;
    type Response = LibraryDBResponse;
    type Id = LibraryId;
    type Filter = LibraryFilter;

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let result = sqlx::query(
            r#"
            INSERT INTO libraries (
                name, physical_address, shipping_address, timezone, coordinates,
                primary_contact_name, primary_contact_email, it_contact_name, it_contact_email,
                opening_hours, network_name, isp,
                contracted_speed_upload, contracted_speed_download,
                bandwidth_cap_upload, bandwidth_cap_download
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&request.name)
        .bind(&request.physical_address)
        .bind(&request.shipping_address)
        .bind(&request.timezone)
        .bind(&request.coordinates)
        .bind(&request.primary_contact_name)
        .bind(&request.primary_contact_email)
        .bind(&request.it_contact_name)
        .bind(&request.it_contact_email)
        .bind(&request.opening_hours)
        .bind(&request.network_name)
        .bind(&request.isp)
        .bind(&request.contracted_speed_upload)
        .bind(&request.contracted_speed_download)
        .bind(&request.bandwidth_cap_upload)
        .bind(&request.bandwidth_cap_download)
        .execute(&mut *self.db)
        .await?;

        // sqlite reports only the rowid from an insert; fetch the full row so
        // callers never see the identity-only shape
        self.fetch_existing(result.last_insert_rowid()).await
    }

    #[instrument(skip(self), fields(library_id = id), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let library = sqlx::query_as::<_, Library>("SELECT * FROM libraries WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(library.map(LibraryDBResponse::from))
    }

    #[instrument(skip(self, filter), fields(start = filter.window.start, sort_by = %filter.window.sort_field), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT libraries.* FROM libraries");

        // Membership scoping goes through the association table: the
        // library/user relation is many-to-many
        if let Some(uid) = filter.of_user {
            query.push(" JOIN library_users ON library_users.lid = libraries.id AND library_users.uid = ");
            query.push_bind(uid);
        }

        query.push(" WHERE 1=1");
        filter.window.push_time_bounds(&mut query, "libraries");
        filter.window.push_order_and_slice(&mut query, "libraries");

        let libraries = query.build_query_as::<Library>().fetch_all(&mut *self.db).await?;

        Ok(libraries.into_iter().map(LibraryDBResponse::from).collect())
    }

    #[instrument(skip(self, request), fields(library_id = id), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<UpdateOutcome<Self::Response>> {
        let result = sqlx::query(
            r#"
            UPDATE libraries SET
                name = COALESCE(?, name),
                physical_address = COALESCE(?, physical_address),
                shipping_address = COALESCE(?, shipping_address),
                timezone = COALESCE(?, timezone),
                coordinates = COALESCE(?, coordinates),
                primary_contact_name = COALESCE(?, primary_contact_name),
                primary_contact_email = COALESCE(?, primary_contact_email),
                it_contact_name = COALESCE(?, it_contact_name),
                it_contact_email = COALESCE(?, it_contact_email),
                opening_hours = COALESCE(?, opening_hours),
                network_name = COALESCE(?, network_name),
                isp = COALESCE(?, isp),
                contracted_speed_upload = COALESCE(?, contracted_speed_upload),
                contracted_speed_download = COALESCE(?, contracted_speed_download),
                bandwidth_cap_upload = COALESCE(?, bandwidth_cap_upload),
                bandwidth_cap_download = COALESCE(?, bandwidth_cap_download)
            WHERE id = ?
            "#,
        )
        .bind(&request.name)
        .bind(&request.physical_address)
        .bind(&request.shipping_address)
        .bind(&request.timezone)
        .bind(&request.coordinates)
        .bind(&request.primary_contact_name)
        .bind(&request.primary_contact_email)
        .bind(&request.it_contact_name)
        .bind(&request.it_contact_email)
        .bind(&request.opening_hours)
        .bind(&request.network_name)
        .bind(&request.isp)
        .bind(&request.contracted_speed_upload)
        .bind(&request.contracted_speed_download)
        .bind(&request.bandwidth_cap_upload)
        .bind(&request.bandwidth_cap_download)
        .bind(id)
        .execute(&mut *self.db)
        .await?;

        if result.rows_affected() > 0 {
            let row = self.fetch_existing(id).await?;
            return Ok(UpdateOutcome { existed: true, row });
        }

        // No row at this identity: materialize one from the payload, which
        // must then satisfy the creation requirements
        let name = request.name.clone().ok_or_else(|| DbError::Unprocessable {
            message: "Cannot create a library without a name.".to_string(),
        })?;

        sqlx::query(
            r#"
            INSERT INTO libraries (
                id, name, physical_address, shipping_address, timezone, coordinates,
                primary_contact_name, primary_contact_email, it_contact_name, it_contact_email,
                opening_hours, network_name, isp,
                contracted_speed_upload, contracted_speed_download,
                bandwidth_cap_upload, bandwidth_cap_download
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(&name)
        .bind(&request.physical_address)
        .bind(&request.shipping_address)
        .bind(&request.timezone)
        .bind(&request.coordinates)
        .bind(&request.primary_contact_name)
        .bind(&request.primary_contact_email)
        .bind(&request.it_contact_name)
        .bind(&request.it_contact_email)
        .bind(&request.opening_hours)
        .bind(&request.network_name)
        .bind(&request.isp)
        .bind(&request.contracted_speed_upload)
        .bind(&request.contracted_speed_download)
        .bind(&request.bandwidth_cap_upload)
        .bind(&request.bandwidth_cap_download)
        .execute(&mut *self.db)
        .await?;

        let row = self.fetch_existing(id).await?;
        Ok(UpdateOutcome { existed: false, row })
    }

    #[instrument(skip(self), fields(library_id = id), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM libraries WHERE id = ?")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

impl<'c> Libraries<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    async fn fetch_existing(&mut self, id: LibraryId) -> Result<LibraryDBResponse> {
        let library = sqlx::query_as::<_, Library>("SELECT * FROM libraries WHERE id = ?")
            .bind(id)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(LibraryDBResponse::from(library))
    }

    /// Insert allowlist rows for a library.
    ///
    /// Each address is inserted with its own statement; a failure partway
    /// leaves the earlier rows in place.
    #[instrument(skip(self, ips), fields(library_id = lid, count = ips.len()), err)]
    pub async fn add_ips(&mut self, lid: LibraryId, ips: &[String]) -> Result<Vec<LibraryIpDBResponse>> {
        let mut created = Vec::with_capacity(ips.len());
        for ip in ips {
            sqlx::query("INSERT INTO library_ips (lid, ip) VALUES (?, ?)")
                .bind(lid)
                .bind(ip)
                .execute(&mut *self.db)
                .await?;
            created.push(LibraryIpDBResponse {
                lid,
                ip: ip.clone(),
            });
        }
        Ok(created)
    }

    /// Find allowlist rows, optionally scoped by library and/or address.
    #[instrument(skip(self), fields(library_id = lid, ip = ip), err)]
    pub async fn find_ips(&mut self, lid: Option<LibraryId>, ip: Option<&str>) -> Result<Vec<LibraryIpDBResponse>> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT lid, ip FROM library_ips WHERE 1=1");
        if let Some(lid) = lid {
            query.push(" AND lid = ");
            query.push_bind(lid);
        }
        if let Some(ip) = ip {
            query.push(" AND ip = ");
            query.push_bind(ip.to_string());
        }
        query.push(" ORDER BY lid, ip");

        let rows: Vec<(LibraryId, String)> = query.build_query_as().fetch_all(&mut *self.db).await?;

        Ok(rows.into_iter().map(|(lid, ip)| LibraryIpDBResponse { lid, ip }).collect())
    }

    /// Delete allowlist rows matching the given scope.
    ///
    /// At least one of the two identities must be present; deleting with
    /// neither would wipe the whole table.
    #[instrument(skip(self), fields(library_id = lid, ip = ip), err)]
    pub async fn delete_ip(&mut self, lid: Option<LibraryId>, ip: Option<&str>) -> Result<u64> {
        if lid.is_none() && ip.is_none() {
            return Err(DbError::Unprocessable {
                message: "Need to specify either library id or IP.".to_string(),
            });
        }

        let mut query = QueryBuilder::<Sqlite>::new("DELETE FROM library_ips WHERE 1=1");
        if let Some(lid) = lid {
            query.push(" AND lid = ");
            query.push_bind(lid);
        }
        if let Some(ip) = ip {
            query.push(" AND ip = ");
            query.push_bind(ip.to_string());
        }

        let result = query.build().execute(&mut *self.db).await?;
        Ok(result.rows_affected())
    }

    /// Whether the given user is a member of the given library.
    #[instrument(skip(self), fields(library_id = lid, user_id = uid), err)]
    pub async fn is_member_of(&mut self, lid: LibraryId, uid: UserId) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM library_users WHERE lid = ? AND uid = ?")
            .bind(lid)
            .bind(uid)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(row.is_some())
    }

    /// Add a user to a library's membership.
    #[instrument(skip(self), fields(library_id = lid, user_id = uid), err)]
    pub async fn add_member(&mut self, lid: LibraryId, uid: UserId) -> Result<()> {
        match sqlx::query("INSERT INTO library_users (lid, uid) VALUES (?, ?) ON CONFLICT DO NOTHING")
            .bind(lid)
            .bind(uid)
            .execute(&mut *self.db)
            .await
        {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => {
                // Either the library or the user does not exist
                Err(DbError::NotFound)
            }
            Err(e) => Err(DbError::from(e)),
        }
    }
}
