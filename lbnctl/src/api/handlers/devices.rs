//! HTTP handlers for measurement devices.
//!
//! Devices follow the same scoping convention as notes and runs: standalone
//! under `/devices`, library-scoped under `/libraries/{id}/devices`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    api::models::{
        devices::{DeviceCreate, DeviceResponse, DeviceUpdate, ListDevicesQuery},
        envelope::Envelope,
    },
    db::{
        handlers::{Devices, Repository},
        models::devices::{DeviceCreateDBRequest, DeviceUpdateDBRequest},
    },
    errors::{Error, Result},
    types::{DeviceId, LibraryId},
    AppState,
};

async fn list(state: AppState, query: ListDevicesQuery, scope: Option<LibraryId>) -> Result<Envelope<Vec<DeviceResponse>>> {
    let filter = query.normalize(scope)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Devices::new(&mut conn);

    let devices = repo.list(&filter).await?;
    Ok(Envelope::ok(devices.into_iter().map(DeviceResponse::from).collect()))
}

async fn create(state: AppState, create: DeviceCreate, scope: Option<LibraryId>) -> Result<Envelope<DeviceResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Devices::new(&mut conn);

    let device = repo.create_scoped(&DeviceCreateDBRequest::from(create), scope).await?;
    Ok(Envelope::created(DeviceResponse::from(device)))
}

fn not_found(id: DeviceId) -> Error {
    Error::NotFound {
        resource: "Device".to_string(),
        id: id.to_string(),
    }
}

#[utoipa::path(
    get,
    path = "/devices",
    tag = "devices",
    summary = "List devices",
    params(ListDevicesQuery),
    responses(
        (status = 200, description = "List of devices", body = Vec<DeviceResponse>),
        (status = 400, description = "Invalid query parameters"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_devices(State(state): State<AppState>, Query(query): Query<ListDevicesQuery>) -> Result<Envelope<Vec<DeviceResponse>>> {
    list(state, query, None).await
}

#[utoipa::path(
    get,
    path = "/libraries/{id}/devices",
    tag = "devices",
    summary = "List devices of a library",
    params(ListDevicesQuery, ("id" = LibraryId, Path, description = "Library ID")),
    responses(
        (status = 200, description = "Devices installed at the library", body = Vec<DeviceResponse>),
        (status = 400, description = "Invalid query parameters"),
    )
)]
#[tracing::instrument(skip_all, fields(library_id = lid))]
pub async fn list_library_devices(
    State(state): State<AppState>,
    Path(lid): Path<LibraryId>,
    Query(query): Query<ListDevicesQuery>,
) -> Result<Envelope<Vec<DeviceResponse>>> {
    list(state, query, Some(lid)).await
}

#[utoipa::path(
    post,
    path = "/devices",
    tag = "devices",
    summary = "Create device",
    request_body = DeviceCreate,
    responses(
        (status = 201, description = "Device created", body = DeviceResponse),
        (status = 409, description = "Device identifier already registered"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_device(State(state): State<AppState>, Json(body): Json<DeviceCreate>) -> Result<Envelope<DeviceResponse>> {
    create(state, body, None).await
}

#[utoipa::path(
    post,
    path = "/libraries/{id}/devices",
    tag = "devices",
    summary = "Create device installed at a library",
    request_body = DeviceCreate,
    params(("id" = LibraryId, Path, description = "Library ID")),
    responses(
        (status = 201, description = "Device created and attached", body = DeviceResponse),
        (status = 404, description = "Library not found"),
        (status = 409, description = "Device identifier already registered"),
    )
)]
#[tracing::instrument(skip_all, fields(library_id = lid))]
pub async fn create_library_device(
    State(state): State<AppState>,
    Path(lid): Path<LibraryId>,
    Json(body): Json<DeviceCreate>,
) -> Result<Envelope<DeviceResponse>> {
    create(state, body, Some(lid)).await
}

#[utoipa::path(
    get,
    path = "/devices/{id}",
    tag = "devices",
    summary = "Get device",
    params(("id" = DeviceId, Path, description = "Device ID")),
    responses(
        (status = 200, description = "Device details", body = DeviceResponse),
        (status = 404, description = "Device not found"),
    )
)]
#[tracing::instrument(skip_all, fields(device_id = id))]
pub async fn get_device(State(state): State<AppState>, Path(id): Path<DeviceId>) -> Result<Envelope<DeviceResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Devices::new(&mut conn);

    match repo.get_by_id(id).await? {
        Some(device) => Ok(Envelope::ok(DeviceResponse::from(device))),
        None => Err(not_found(id)),
    }
}

#[utoipa::path(
    get,
    path = "/libraries/{id}/devices/{did}",
    tag = "devices",
    summary = "Get device within a library",
    params(
        ("id" = LibraryId, Path, description = "Library ID"),
        ("did" = DeviceId, Path, description = "Device ID"),
    ),
    responses(
        (status = 200, description = "Device details", body = DeviceResponse),
        (status = 404, description = "Device not found or not installed at the library"),
    )
)]
#[tracing::instrument(skip_all, fields(library_id = lid, device_id = id))]
pub async fn get_library_device(
    State(state): State<AppState>,
    Path((lid, id)): Path<(LibraryId, DeviceId)>,
) -> Result<Envelope<DeviceResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Devices::new(&mut conn);

    match repo.get_scoped(id, Some(lid)).await? {
        Some(device) => Ok(Envelope::ok(DeviceResponse::from(device))),
        None => Err(not_found(id)),
    }
}

#[utoipa::path(
    put,
    path = "/devices/{id}",
    tag = "devices",
    summary = "Update device",
    request_body = DeviceUpdate,
    params(("id" = DeviceId, Path, description = "Device ID")),
    responses(
        (status = 204, description = "Existing device updated"),
        (status = 201, description = "No device at this identity; one was created", body = DeviceResponse),
        (status = 422, description = "Unusable payload"),
    )
)]
#[tracing::instrument(skip_all, fields(device_id = id))]
pub async fn update_device(State(state): State<AppState>, Path(id): Path<DeviceId>, Json(update): Json<DeviceUpdate>) -> Result<Response> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Devices::new(&mut conn);

    let outcome = repo.update(id, &DeviceUpdateDBRequest::from(update)).await?;
    if outcome.existed {
        Ok(StatusCode::NO_CONTENT.into_response())
    } else {
        Ok(Envelope::created(DeviceResponse::from(outcome.row)).into_response())
    }
}

#[utoipa::path(
    put,
    path = "/libraries/{id}/devices/{did}",
    tag = "devices",
    summary = "Attach device to a library",
    params(
        ("id" = LibraryId, Path, description = "Library ID"),
        ("did" = DeviceId, Path, description = "Device ID"),
    ),
    responses(
        (status = 204, description = "Device attached"),
        (status = 404, description = "Library or device not found"),
    )
)]
#[tracing::instrument(skip_all, fields(library_id = lid, device_id = id))]
pub async fn attach_device(State(state): State<AppState>, Path((lid, id)): Path<(LibraryId, DeviceId)>) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Devices::new(&mut conn);

    repo.add_to_library(lid, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/devices/{id}",
    tag = "devices",
    summary = "Delete device",
    params(("id" = DeviceId, Path, description = "Device ID")),
    responses(
        (status = 204, description = "Device deleted"),
        (status = 404, description = "Device not found"),
    )
)]
#[tracing::instrument(skip_all, fields(device_id = id))]
pub async fn delete_device(State(state): State<AppState>, Path(id): Path<DeviceId>) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Devices::new(&mut conn);

    if repo.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(id))
    }
}

#[utoipa::path(
    delete,
    path = "/libraries/{id}/devices/{did}",
    tag = "devices",
    summary = "Detach device from a library",
    params(
        ("id" = LibraryId, Path, description = "Library ID"),
        ("did" = DeviceId, Path, description = "Device ID"),
    ),
    responses(
        (status = 204, description = "Device detached; the device record survives"),
        (status = 404, description = "Device was not attached to the library"),
    )
)]
#[tracing::instrument(skip_all, fields(library_id = lid, device_id = id))]
pub async fn detach_device(State(state): State<AppState>, Path((lid, id)): Path<(LibraryId, DeviceId)>) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Devices::new(&mut conn);

    if repo.remove_from_library(lid, id).await? > 0 {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(id))
    }
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{create_test_app, create_test_library};
    use serde_json::json;
    use sqlx::SqlitePool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_device_lifecycle(pool: SqlitePool) {
        let server = create_test_app(pool.clone()).await;
        let lid = create_test_library(&pool, "Central").await;

        let response = server
            .post(&format!("/api/v1/libraries/{lid}/devices"))
            .json(&json!({
                "name": "probe-1",
                "deviceid": "odroid-001",
                "network_type": "wired",
                "connection_type": "ethernet",
            }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        let id = response.json::<serde_json::Value>()["data"]["id"].as_i64().unwrap();

        let response = server.get(&format!("/api/v1/libraries/{lid}/devices")).await;
        let body: serde_json::Value = response.json();
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["deviceid"], "odroid-001");

        let response = server
            .put(&format!("/api/v1/devices/{id}"))
            .json(&json!({"ip": "10.1.2.3"}))
            .await;
        response.assert_status(axum::http::StatusCode::NO_CONTENT);

        let response = server.get(&format!("/api/v1/devices/{id}")).await;
        let body: serde_json::Value = response.json();
        assert_eq!(body["data"]["ip"], "10.1.2.3");
        assert_eq!(body["data"]["name"], "probe-1");

        let response = server.delete(&format!("/api/v1/devices/{id}")).await;
        response.assert_status(axum::http::StatusCode::NO_CONTENT);
        let response = server.get(&format!("/api/v1/devices/{id}")).await;
        response.assert_status_not_found();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_duplicate_deviceid_conflicts(pool: SqlitePool) {
        let server = create_test_app(pool).await;

        let body = json!({"name": "probe", "deviceid": "odroid-001"});
        server.post("/api/v1/devices").json(&body).await;
        let response = server.post("/api/v1/devices").json(&body).await;
        response.assert_status(axum::http::StatusCode::CONFLICT);
        let error: serde_json::Value = response.json();
        assert_eq!(error["status"], "error");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_device_attach_detach(pool: SqlitePool) {
        let server = create_test_app(pool.clone()).await;
        let lid = create_test_library(&pool, "Central").await;

        let response = server
            .post("/api/v1/devices")
            .json(&json!({"name": "probe", "deviceid": "odroid-001"}))
            .await;
        let id = response.json::<serde_json::Value>()["data"]["id"].as_i64().unwrap();

        let response = server.put(&format!("/api/v1/libraries/{lid}/devices/{id}")).await;
        response.assert_status(axum::http::StatusCode::NO_CONTENT);
        let response = server.get(&format!("/api/v1/libraries/{lid}/devices/{id}")).await;
        response.assert_status_ok();

        let response = server.delete(&format!("/api/v1/libraries/{lid}/devices/{id}")).await;
        response.assert_status(axum::http::StatusCode::NO_CONTENT);
        let response = server.get(&format!("/api/v1/libraries/{lid}/devices/{id}")).await;
        response.assert_status_not_found();
    }
}
