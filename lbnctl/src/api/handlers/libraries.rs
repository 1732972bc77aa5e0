//! HTTP handlers for libraries and their IP allowlists.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    api::models::{
        envelope::Envelope,
        libraries::{LibraryCreate, LibraryIpResponse, LibraryResponse, LibraryUpdate, ListLibrariesQuery},
    },
    db::{
        handlers::{Libraries, Repository},
        models::libraries::{LibraryCreateDBRequest, LibraryUpdateDBRequest},
    },
    errors::{Error, Result},
    types::LibraryId,
    AppState,
};

#[utoipa::path(
    get,
    path = "/libraries",
    tag = "libraries",
    summary = "List libraries",
    params(ListLibrariesQuery),
    responses(
        (status = 200, description = "List of libraries", body = Vec<LibraryResponse>),
        (status = 400, description = "Invalid query parameters"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_libraries(
    State(state): State<AppState>,
    Query(query): Query<ListLibrariesQuery>,
) -> Result<Envelope<Vec<LibraryResponse>>> {
    let filter = query.normalize()?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Libraries::new(&mut conn);

    let libraries = repo.list(&filter).await?;
    Ok(Envelope::ok(libraries.into_iter().map(LibraryResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/libraries",
    tag = "libraries",
    summary = "Create library",
    request_body = LibraryCreate,
    responses(
        (status = 201, description = "Library created", body = LibraryResponse),
        (status = 400, description = "Invalid request"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_library(State(state): State<AppState>, Json(create): Json<LibraryCreate>) -> Result<Envelope<LibraryResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Libraries::new(&mut conn);

    let library = repo.create(&LibraryCreateDBRequest::from(create)).await?;
    Ok(Envelope::created(LibraryResponse::from(library)))
}

#[utoipa::path(
    get,
    path = "/libraries/{id}",
    tag = "libraries",
    summary = "Get library",
    params(("id" = LibraryId, Path, description = "Library ID")),
    responses(
        (status = 200, description = "Library details", body = LibraryResponse),
        (status = 404, description = "Library not found"),
    )
)]
#[tracing::instrument(skip_all, fields(library_id = id))]
pub async fn get_library(State(state): State<AppState>, Path(id): Path<LibraryId>) -> Result<Envelope<LibraryResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Libraries::new(&mut conn);

    match repo.get_by_id(id).await? {
        Some(library) => Ok(Envelope::ok(LibraryResponse::from(library))),
        None => Err(Error::NotFound {
            resource: "Library".to_string(),
            id: id.to_string(),
        }),
    }
}

#[utoipa::path(
    put,
    path = "/libraries/{id}",
    tag = "libraries",
    summary = "Update library",
    request_body = LibraryUpdate,
    params(("id" = LibraryId, Path, description = "Library ID")),
    responses(
        (status = 204, description = "Existing library updated"),
        (status = 201, description = "No library at this identity; one was created", body = LibraryResponse),
        (status = 422, description = "Unusable payload"),
    )
)]
#[tracing::instrument(skip_all, fields(library_id = id))]
pub async fn update_library(
    State(state): State<AppState>,
    Path(id): Path<LibraryId>,
    Json(update): Json<LibraryUpdate>,
) -> Result<Response> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Libraries::new(&mut conn);

    let outcome = repo.update(id, &LibraryUpdateDBRequest::from(update)).await?;
    if outcome.existed {
        Ok(StatusCode::NO_CONTENT.into_response())
    } else {
        Ok(Envelope::created(LibraryResponse::from(outcome.row)).into_response())
    }
}

#[utoipa::path(
    delete,
    path = "/libraries/{id}",
    tag = "libraries",
    summary = "Delete library",
    params(("id" = LibraryId, Path, description = "Library ID")),
    responses(
        (status = 204, description = "Library deleted, along with its join rows"),
        (status = 404, description = "Library not found"),
    )
)]
#[tracing::instrument(skip_all, fields(library_id = id))]
pub async fn delete_library(State(state): State<AppState>, Path(id): Path<LibraryId>) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Libraries::new(&mut conn);

    if repo.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::NotFound {
            resource: "Library".to_string(),
            id: id.to_string(),
        })
    }
}

#[utoipa::path(
    get,
    path = "/libraries/{id}/ip",
    tag = "libraries",
    summary = "List allowlisted addresses",
    params(("id" = LibraryId, Path, description = "Library ID")),
    responses(
        (status = 200, description = "Allowlisted addresses of the library", body = Vec<LibraryIpResponse>),
    )
)]
#[tracing::instrument(skip_all, fields(library_id = id))]
pub async fn list_library_ips(State(state): State<AppState>, Path(id): Path<LibraryId>) -> Result<Envelope<Vec<LibraryIpResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Libraries::new(&mut conn);

    let ips = repo.find_ips(Some(id), None).await?;
    Ok(Envelope::ok(ips.into_iter().map(LibraryIpResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/libraries/{id}/ip/{address}",
    tag = "libraries",
    summary = "Look up an allowlisted address",
    params(
        ("id" = LibraryId, Path, description = "Library ID"),
        ("address" = String, Path, description = "IP address"),
    ),
    responses(
        (status = 200, description = "Matching allowlist rows", body = Vec<LibraryIpResponse>),
        (status = 404, description = "Address not allowlisted for this library"),
    )
)]
#[tracing::instrument(skip_all, fields(library_id = id, ip = %address))]
pub async fn get_library_ip(
    State(state): State<AppState>,
    Path((id, address)): Path<(LibraryId, String)>,
) -> Result<Envelope<Vec<LibraryIpResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Libraries::new(&mut conn);

    let ips = repo.find_ips(Some(id), Some(&address)).await?;
    if ips.is_empty() {
        return Err(Error::NotFound {
            resource: "IP".to_string(),
            id: address,
        });
    }
    Ok(Envelope::ok(ips.into_iter().map(LibraryIpResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/libraries/{id}/ip/{address}",
    tag = "libraries",
    summary = "Allowlist an address",
    params(
        ("id" = LibraryId, Path, description = "Library ID"),
        ("address" = String, Path, description = "IP address"),
    ),
    responses(
        (status = 201, description = "Allowlist rows created", body = Vec<LibraryIpResponse>),
        (status = 400, description = "Library does not exist"),
        (status = 409, description = "Address already allowlisted"),
    )
)]
#[tracing::instrument(skip_all, fields(library_id = id, ip = %address))]
pub async fn create_library_ip(
    State(state): State<AppState>,
    Path((id, address)): Path<(LibraryId, String)>,
) -> Result<Envelope<Vec<LibraryIpResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Libraries::new(&mut conn);

    let created = repo.add_ips(id, std::slice::from_ref(&address)).await?;
    Ok(Envelope::created(created.into_iter().map(LibraryIpResponse::from).collect()))
}

#[utoipa::path(
    delete,
    path = "/libraries/{id}/ip/{address}",
    tag = "libraries",
    summary = "Remove an allowlisted address",
    params(
        ("id" = LibraryId, Path, description = "Library ID"),
        ("address" = String, Path, description = "IP address"),
    ),
    responses(
        (status = 204, description = "Allowlist rows removed"),
        (status = 404, description = "Address not allowlisted for this library"),
    )
)]
#[tracing::instrument(skip_all, fields(library_id = id, ip = %address))]
pub async fn delete_library_ip(State(state): State<AppState>, Path((id, address)): Path<(LibraryId, String)>) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Libraries::new(&mut conn);

    let removed = repo.delete_ip(Some(id), Some(&address)).await?;
    if removed == 0 {
        return Err(Error::NotFound {
            resource: "IP".to_string(),
            id: address,
        });
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::test_utils::create_test_app;
    use serde_json::json;
    use sqlx::SqlitePool;

    /// The POST / GET / DELETE / GET round trip from the admin dashboard.
    #[sqlx::test]
    #[test_log::test]
    async fn test_library_lifecycle(pool: SqlitePool) {
        let server = create_test_app(pool).await;

        let response = server.post("/api/v1/libraries").json(&json!({"name": "Central"})).await;
        response.assert_status(axum::http::StatusCode::CREATED);
        let body: serde_json::Value = response.json();
        assert_eq!(body["statusCode"], 201);
        assert_eq!(body["status"], "created");
        let id = body["data"]["id"].as_i64().unwrap();
        assert!(id > 0);

        let response = server.get(&format!("/api/v1/libraries/{id}")).await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["statusCode"], 200);
        assert_eq!(body["data"]["name"], "Central");

        let response = server.delete(&format!("/api/v1/libraries/{id}")).await;
        response.assert_status(axum::http::StatusCode::NO_CONTENT);
        assert!(response.text().is_empty());

        let response = server.get(&format!("/api/v1/libraries/{id}")).await;
        response.assert_status_not_found();
        let body: serde_json::Value = response.json();
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], format!("Library with ID {id} does not exist"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_libraries_sorted_window(pool: SqlitePool) {
        let server = create_test_app(pool).await;

        for name in ["delta", "alpha", "charlie", "bravo"] {
            server.post("/api/v1/libraries").json(&json!({"name": name})).await;
        }

        let response = server.get("/api/v1/libraries?sort_by=name&start=1&end=3").await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        let names: Vec<_> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|l| l["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["bravo", "charlie"]);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_library(pool: SqlitePool) {
        let server = create_test_app(pool).await;

        let response = server.post("/api/v1/libraries").json(&json!({"name": "Central"})).await;
        let id = response.json::<serde_json::Value>()["data"]["id"].as_i64().unwrap();

        let response = server
            .put(&format!("/api/v1/libraries/{id}"))
            .json(&json!({"isp": "Example Networks"}))
            .await;
        response.assert_status(axum::http::StatusCode::NO_CONTENT);

        let response = server.get(&format!("/api/v1/libraries/{id}")).await;
        let body: serde_json::Value = response.json();
        assert_eq!(body["data"]["isp"], "Example Networks");
        assert_eq!(body["data"]["name"], "Central");

        // PUT against a missing identity creates the row and says so
        let response = server.put("/api/v1/libraries/500").json(&json!({"name": "Popup"})).await;
        response.assert_status(axum::http::StatusCode::CREATED);
        let body: serde_json::Value = response.json();
        assert_eq!(body["data"]["id"], 500);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_ip_allowlist_endpoints(pool: SqlitePool) {
        let server = create_test_app(pool).await;

        let response = server.post("/api/v1/libraries").json(&json!({"name": "Central"})).await;
        let id = response.json::<serde_json::Value>()["data"]["id"].as_i64().unwrap();

        let response = server.post(&format!("/api/v1/libraries/{id}/ip/203.0.113.9")).await;
        response.assert_status(axum::http::StatusCode::CREATED);
        let body: serde_json::Value = response.json();
        assert_eq!(body["data"][0]["lid"], id);
        assert_eq!(body["data"][0]["ip"], "203.0.113.9");

        let response = server.get(&format!("/api/v1/libraries/{id}/ip")).await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let response = server.get(&format!("/api/v1/libraries/{id}/ip/203.0.113.9")).await;
        response.assert_status_ok();

        let response = server.get(&format!("/api/v1/libraries/{id}/ip/198.51.100.1")).await;
        response.assert_status_not_found();

        let response = server.delete(&format!("/api/v1/libraries/{id}/ip/203.0.113.9")).await;
        response.assert_status(axum::http::StatusCode::NO_CONTENT);

        let response = server.delete(&format!("/api/v1/libraries/{id}/ip/203.0.113.9")).await;
        response.assert_status_not_found();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_ip_for_missing_library_is_rejected(pool: SqlitePool) {
        let server = create_test_app(pool).await;

        let response = server.post("/api/v1/libraries/999/ip/203.0.113.9").await;
        response.assert_status(axum::http::StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        assert_eq!(body["status"], "error");
    }
}
