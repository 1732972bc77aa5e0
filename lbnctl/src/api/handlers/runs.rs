//! HTTP handlers for measurement runs.
//!
//! Runs follow the same scoping convention as notes: standalone under
//! `/runs`, library-scoped under `/libraries/{id}/runs`. Measurement
//! devices upload results through the scoped POST so the run lands attached
//! to the library it was measured at.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    api::models::{
        envelope::Envelope,
        runs::{ListRunsQuery, RunCreate, RunResponse, RunUpdate},
    },
    db::{
        handlers::{Repository, Runs},
        models::runs::{RunCreateDBRequest, RunUpdateDBRequest},
    },
    errors::{Error, Result},
    types::{LibraryId, RunId},
    AppState,
};

async fn list(state: AppState, query: ListRunsQuery, scope: Option<LibraryId>) -> Result<Envelope<Vec<RunResponse>>> {
    let filter = query.normalize(scope)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Runs::new(&mut conn);

    let runs = repo.list(&filter).await?;
    Ok(Envelope::ok(runs.into_iter().map(RunResponse::from).collect()))
}

async fn create(state: AppState, create: RunCreate, scope: Option<LibraryId>) -> Result<Envelope<RunResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Runs::new(&mut conn);

    let run = repo.create_scoped(&RunCreateDBRequest::from(create), scope).await?;
    Ok(Envelope::created(RunResponse::from(run)))
}

fn not_found(id: RunId) -> Error {
    Error::NotFound {
        resource: "Run".to_string(),
        id: id.to_string(),
    }
}

#[utoipa::path(
    get,
    path = "/runs",
    tag = "runs",
    summary = "List runs",
    params(ListRunsQuery),
    responses(
        (status = 200, description = "List of runs", body = Vec<RunResponse>),
        (status = 400, description = "Invalid query parameters"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_runs(State(state): State<AppState>, Query(query): Query<ListRunsQuery>) -> Result<Envelope<Vec<RunResponse>>> {
    list(state, query, None).await
}

#[utoipa::path(
    get,
    path = "/libraries/{id}/runs",
    tag = "runs",
    summary = "List runs of a library",
    params(ListRunsQuery, ("id" = LibraryId, Path, description = "Library ID")),
    responses(
        (status = 200, description = "Runs attached to the library", body = Vec<RunResponse>),
        (status = 400, description = "Invalid query parameters"),
    )
)]
#[tracing::instrument(skip_all, fields(library_id = lid))]
pub async fn list_library_runs(
    State(state): State<AppState>,
    Path(lid): Path<LibraryId>,
    Query(query): Query<ListRunsQuery>,
) -> Result<Envelope<Vec<RunResponse>>> {
    list(state, query, Some(lid)).await
}

#[utoipa::path(
    post,
    path = "/runs",
    tag = "runs",
    summary = "Create run",
    request_body = RunCreate,
    responses(
        (status = 201, description = "Run created", body = RunResponse),
        (status = 400, description = "Invalid request"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_run(State(state): State<AppState>, Json(body): Json<RunCreate>) -> Result<Envelope<RunResponse>> {
    create(state, body, None).await
}

#[utoipa::path(
    post,
    path = "/libraries/{id}/runs",
    tag = "runs",
    summary = "Create run attached to a library",
    request_body = RunCreate,
    params(("id" = LibraryId, Path, description = "Library ID")),
    responses(
        (status = 201, description = "Run created and attached", body = RunResponse),
        (status = 404, description = "Library not found"),
    )
)]
#[tracing::instrument(skip_all, fields(library_id = lid))]
pub async fn create_library_run(
    State(state): State<AppState>,
    Path(lid): Path<LibraryId>,
    Json(body): Json<RunCreate>,
) -> Result<Envelope<RunResponse>> {
    create(state, body, Some(lid)).await
}

#[utoipa::path(
    get,
    path = "/runs/{id}",
    tag = "runs",
    summary = "Get run",
    params(("id" = RunId, Path, description = "Run ID")),
    responses(
        (status = 200, description = "Run details", body = RunResponse),
        (status = 404, description = "Run not found"),
    )
)]
#[tracing::instrument(skip_all, fields(run_id = id))]
pub async fn get_run(State(state): State<AppState>, Path(id): Path<RunId>) -> Result<Envelope<RunResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Runs::new(&mut conn);

    match repo.get_by_id(id).await? {
        Some(run) => Ok(Envelope::ok(RunResponse::from(run))),
        None => Err(not_found(id)),
    }
}

#[utoipa::path(
    get,
    path = "/libraries/{id}/runs/{rid}",
    tag = "runs",
    summary = "Get run within a library",
    params(
        ("id" = LibraryId, Path, description = "Library ID"),
        ("rid" = RunId, Path, description = "Run ID"),
    ),
    responses(
        (status = 200, description = "Run details", body = RunResponse),
        (status = 404, description = "Run not found or not attached to the library"),
    )
)]
#[tracing::instrument(skip_all, fields(library_id = lid, run_id = id))]
pub async fn get_library_run(State(state): State<AppState>, Path((lid, id)): Path<(LibraryId, RunId)>) -> Result<Envelope<RunResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Runs::new(&mut conn);

    match repo.get_scoped(id, Some(lid)).await? {
        Some(run) => Ok(Envelope::ok(RunResponse::from(run))),
        None => Err(not_found(id)),
    }
}

#[utoipa::path(
    put,
    path = "/runs/{id}",
    tag = "runs",
    summary = "Update run",
    request_body = RunUpdate,
    params(("id" = RunId, Path, description = "Run ID")),
    responses(
        (status = 204, description = "Existing run updated"),
        (status = 201, description = "No run at this identity; one was created", body = RunResponse),
        (status = 422, description = "Unusable payload"),
    )
)]
#[tracing::instrument(skip_all, fields(run_id = id))]
pub async fn update_run(State(state): State<AppState>, Path(id): Path<RunId>, Json(update): Json<RunUpdate>) -> Result<Response> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Runs::new(&mut conn);

    let outcome = repo.update(id, &RunUpdateDBRequest::from(update)).await?;
    if outcome.existed {
        Ok(StatusCode::NO_CONTENT.into_response())
    } else {
        Ok(Envelope::created(RunResponse::from(outcome.row)).into_response())
    }
}

#[utoipa::path(
    put,
    path = "/libraries/{id}/runs/{rid}",
    tag = "runs",
    summary = "Attach run to a library",
    params(
        ("id" = LibraryId, Path, description = "Library ID"),
        ("rid" = RunId, Path, description = "Run ID"),
    ),
    responses(
        (status = 204, description = "Run attached"),
        (status = 404, description = "Library or run not found"),
    )
)]
#[tracing::instrument(skip_all, fields(library_id = lid, run_id = id))]
pub async fn attach_run(State(state): State<AppState>, Path((lid, id)): Path<(LibraryId, RunId)>) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Runs::new(&mut conn);

    repo.add_to_library(lid, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/runs/{id}",
    tag = "runs",
    summary = "Delete run",
    params(("id" = RunId, Path, description = "Run ID")),
    responses(
        (status = 204, description = "Run deleted"),
        (status = 404, description = "Run not found"),
    )
)]
#[tracing::instrument(skip_all, fields(run_id = id))]
pub async fn delete_run(State(state): State<AppState>, Path(id): Path<RunId>) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Runs::new(&mut conn);

    if repo.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(id))
    }
}

#[utoipa::path(
    delete,
    path = "/libraries/{id}/runs/{rid}",
    tag = "runs",
    summary = "Detach run from a library",
    params(
        ("id" = LibraryId, Path, description = "Library ID"),
        ("rid" = RunId, Path, description = "Run ID"),
    ),
    responses(
        (status = 204, description = "Run detached; the run itself survives"),
        (status = 404, description = "Run was not attached to the library"),
    )
)]
#[tracing::instrument(skip_all, fields(library_id = lid, run_id = id))]
pub async fn detach_run(State(state): State<AppState>, Path((lid, id)): Path<(LibraryId, RunId)>) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Runs::new(&mut conn);

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
    async fn test_run_upload_and_readback(pool: SqlitePool) {
        let server = create_test_app(pool.clone()).await;
        let lid = create_test_library(&pool, "Central").await;

        let payload = json!({"download_mbps": 87.3, "upload_mbps": 11.2});
        let response = server
            .post(&format!("/api/v1/libraries/{lid}/runs"))
            .json(&json!({"test": "ndt7", "result": payload}))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        let body: serde_json::Value = response.json();
        let id = body["data"]["id"].as_i64().unwrap();
        assert_eq!(body["data"]["result"], payload);

        let response = server.get(&format!("/api/v1/libraries/{lid}/runs/{id}")).await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["data"]["test"], "ndt7");
        assert_eq!(body["data"]["result"]["download_mbps"], 87.3);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_runs_filtered_by_test(pool: SqlitePool) {
        let server = create_test_app(pool).await;

        server.post("/api/v1/runs").json(&json!({"test": "ndt7"})).await;
        server.post("/api/v1/runs").json(&json!({"test": "speedtest"})).await;
        server.post("/api/v1/runs").json(&json!({"test": "ndt7"})).await;

        let response = server.get("/api/v1/runs?test=ndt7").await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["data"].as_array().unwrap().len(), 2);

        let response = server.get("/api/v1/runs").await;
        let body: serde_json::Value = response.json();
        assert_eq!(body["data"].as_array().unwrap().len(), 3);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_run_attach_detach(pool: SqlitePool) {
        let server = create_test_app(pool.clone()).await;
        let lid = create_test_library(&pool, "Central").await;

        let response = server.post("/api/v1/runs").json(&json!({"test": "ndt7"})).await;
        let id = response.json::<serde_json::Value>()["data"]["id"].as_i64().unwrap();

        let response = server.get(&format!("/api/v1/libraries/{lid}/runs/{id}")).await;
        response.assert_status_not_found();

        let response = server.put(&format!("/api/v1/libraries/{lid}/runs/{id}")).await;
        response.assert_status(axum::http::StatusCode::NO_CONTENT);
        let response = server.get(&format!("/api/v1/libraries/{lid}/runs/{id}")).await;
        response.assert_status_ok();

        let response = server.delete(&format!("/api/v1/libraries/{lid}/runs/{id}")).await;
        response.assert_status(axum::http::StatusCode::NO_CONTENT);
        let response = server.delete(&format!("/api/v1/libraries/{lid}/runs/{id}")).await;
        response.assert_status_not_found();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_and_delete_run(pool: SqlitePool) {
        let server = create_test_app(pool).await;

        let response = server.post("/api/v1/runs").json(&json!({"test": "ndt7"})).await;
        let id = response.json::<serde_json::Value>()["data"]["id"].as_i64().unwrap();

        let response = server
            .put(&format!("/api/v1/runs/{id}"))
            .json(&json!({"result": {"download_mbps": 42.0}}))
            .await;
        response.assert_status(axum::http::StatusCode::NO_CONTENT);

        let response = server.get(&format!("/api/v1/runs/{id}")).await;
        let body: serde_json::Value = response.json();
        assert_eq!(body["data"]["test"], "ndt7");
        assert_eq!(body["data"]["result"]["download_mbps"], 42.0);

        let response = server.delete(&format!("/api/v1/runs/{id}")).await;
        response.assert_status(axum::http::StatusCode::NO_CONTENT);
        let response = server.delete(&format!("/api/v1/runs/{id}")).await;
        response.assert_status_not_found();
    }
}
