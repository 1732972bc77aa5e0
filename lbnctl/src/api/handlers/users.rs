//! HTTP handlers for user accounts.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    api::models::{
        envelope::Envelope,
        users::{ListUsersQuery, UserCreate, UserResponse, UserUpdate},
    },
    auth::password,
    db::{
        handlers::{Repository, Users},
        models::users::{UserCreateDBRequest, UserUpdateDBRequest},
    },
    errors::{Error, Result},
    types::UserId,
    AppState,
};

/// Hash a password on a blocking thread so argon2 does not stall the runtime.
async fn hash_password(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || password::hash_string(&password))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password hashing task: {e}"),
        })?
}

#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    summary = "List users",
    params(ListUsersQuery),
    responses(
        (status = 200, description = "List of users", body = Vec<UserResponse>),
        (status = 400, description = "Invalid query parameters"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_users(State(state): State<AppState>, Query(query): Query<ListUsersQuery>) -> Result<Envelope<Vec<UserResponse>>> {
    let filter = query.normalize()?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Users::new(&mut conn);

    let users = repo.list(&filter).await?;
    Ok(Envelope::ok(users.into_iter().map(UserResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    summary = "Create user",
    request_body = UserCreate,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 409, description = "Username already taken"),
        (status = 422, description = "Unusable payload"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_user(State(state): State<AppState>, Json(create): Json<UserCreate>) -> Result<Envelope<UserResponse>> {
    if create.password.is_empty() {
        return Err(Error::Unprocessable {
            message: "Password must not be empty.".to_string(),
        });
    }

    let password_hash = hash_password(create.password.clone()).await?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Users::new(&mut conn);

    let user = repo.create(&UserCreateDBRequest::new(create, password_hash)).await?;
    Ok(Envelope::created(UserResponse::from(user)))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    summary = "Get user",
    params(("id" = UserId, Path, description = "User ID")),
    responses(
        (status = 200, description = "User details", body = UserResponse),
        (status = 404, description = "User not found"),
    )
)]
#[tracing::instrument(skip_all, fields(user_id = id))]
pub async fn get_user(State(state): State<AppState>, Path(id): Path<UserId>) -> Result<Envelope<UserResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Users::new(&mut conn);

    match repo.get_by_id(id).await? {
        Some(user) => Ok(Envelope::ok(UserResponse::from(user))),
        None => Err(Error::NotFound {
            resource: "User".to_string(),
            id: id.to_string(),
        }),
    }
}

#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "users",
    summary = "Update user",
    request_body = UserUpdate,
    params(("id" = UserId, Path, description = "User ID")),
    responses(
        (status = 204, description = "Existing user updated"),
        (status = 201, description = "No user at this identity; one was created", body = UserResponse),
        (status = 422, description = "Unusable payload"),
    )
)]
#[tracing::instrument(skip_all, fields(user_id = id))]
pub async fn update_user(State(state): State<AppState>, Path(id): Path<UserId>, Json(update): Json<UserUpdate>) -> Result<Response> {
    let password_hash = match update.password {
        Some(ref password) => Some(hash_password(password.clone()).await?),
        None => None,
    };
    let request = UserUpdateDBRequest {
        username: update.username,
        password_hash,
        first_name: update.first_name,
        last_name: update.last_name,
        email: update.email,
        location: update.location,
        role: update.role,
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Users::new(&mut conn);

    let outcome = repo.update(id, &request).await?;
    if outcome.existed {
        Ok(StatusCode::NO_CONTENT.into_response())
    } else {
        Ok(Envelope::created(UserResponse::from(outcome.row)).into_response())
    }
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "users",
    summary = "Delete user",
    params(("id" = UserId, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 404, description = "User not found"),
    )
)]
#[tracing::instrument(skip_all, fields(user_id = id))]
pub async fn delete_user(State(state): State<AppState>, Path(id): Path<UserId>) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Users::new(&mut conn);

    if repo.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::NotFound {
            resource: "User".to_string(),
            id: id.to_string(),
        })
    }
}
