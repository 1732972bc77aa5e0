//! Database repository for users.

use crate::api::models::query::Window;
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::{Repository, UpdateOutcome},
    models::users::{UserCreateDBRequest, UserDBResponse, UserUpdateDBRequest},
};
use crate::types::UserId;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection};
use tracing::instrument;

/// Columns a user listing may be ordered by
pub const SORTABLE: &[&str] = &["id", "username", "first_name", "last_name", "location", "role", "created_at", "updated_at"];

/// Filter for listing users
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub window: Window,
}

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct User {
    pub id: UserId,
    pub username: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub location: Option<String>,
    pub role: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserDBResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            password_hash: user.password,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            location: user.location,
            role: user.role,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

pub struct Users<'c> {
    db: &'c mut SqliteConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Users<'c> {
    type CreateRequest = UserCreateDBRequest;
    type UpdateRequest = UserUpdateDBRequest;
    type Response = UserDBResponse;
    type Id = UserId;
    type Filter = UserFilter;

    #[instrument(skip(self, request), fields(username = %request.username), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (username, password, first_name, last_name, email, location, role)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&request.username)
        .bind(&request.password_hash)
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(&request.email)
        .bind(&request.location)
        .bind(request.role)
        .execute(&mut *self.db)
        .await?;

        self.fetch_existing(result.last_insert_rowid()).await
    }

    #[instrument(skip(self), fields(user_id = id), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(user.map(UserDBResponse::from))
    }

    #[instrument(skip(self, filter), fields(start = filter.window.start, sort_by = %filter.window.sort_field), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT users.* FROM users WHERE 1=1");
        filter.window.push_time_bounds(&mut query, "users");
        filter.window.push_order_and_slice(&mut query, "users");

        let users = query.build_query_as::<User>().fetch_all(&mut *self.db).await?;

        Ok(users.into_iter().map(UserDBResponse::from).collect())
    }

    #[instrument(skip(self, request), fields(user_id = id), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<UpdateOutcome<Self::Response>> {
        let result = sqlx::query(
            r#"
            UPDATE users SET
                username = COALESCE(?, username),
                password = COALESCE(?, password),
                first_name = COALESCE(?, first_name),
                last_name = COALESCE(?, last_name),
                email = COALESCE(?, email),
                location = COALESCE(?, location),
                role = COALESCE(?, role)
            WHERE id = ?
            "#,
        )
        .bind(&request.username)
        .bind(&request.password_hash)
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(&request.email)
        .bind(&request.location)
        .bind(request.role)
        .bind(id)
        .execute(&mut *self.db)
        .await?;

        if result.rows_affected() > 0 {
            let row = self.fetch_existing(id).await?;
            return Ok(UpdateOutcome { existed: true, row });
        }

        let (username, password_hash) = match (&request.username, &request.password_hash) {
            (Some(username), Some(hash)) => (username.clone(), hash.clone()),
            _ => {
                return Err(DbError::Unprocessable {
                    message: "Cannot create a user without a username and password.".to_string(),
                })
            }
        };

        sqlx::query(
            r#"
            INSERT INTO users (id, username, password, first_name, last_name, email, location, role)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(&username)
        .bind(&password_hash)
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(&request.email)
        .bind(&request.location)
        .bind(request.role)
        .execute(&mut *self.db)
        .await?;

        let row = self.fetch_existing(id).await?;
        Ok(UpdateOutcome { existed: false, row })
    }

    #[instrument(skip(self), fields(user_id = id), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

impl<'c> Users<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    async fn fetch_existing(&mut self, id: UserId) -> Result<UserDBResponse> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(UserDBResponse::from(user))
    }

    /// Credential lookup for login.
    #[instrument(skip(self, username), err)]
    pub async fn get_by_username(&mut self, username: &str) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(user.map(UserDBResponse::from))
    }
}
