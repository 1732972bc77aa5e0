//! HTTP handlers for notes.
//!
//! Notes exist on their own under `/notes` and carry an optional library
//! scope under `/libraries/{id}/notes`. The scoped collection routes filter
//! and create through the association table; the scoped item routes attach
//! (PUT) and detach (DELETE) an existing note instead of mutating it.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    api::models::{
        envelope::Envelope,
        notes::{ListNotesQuery, NoteCreate, NoteResponse, NoteUpdate},
    },
    db::{
        handlers::{Notes, Repository},
        models::notes::{NoteCreateDBRequest, NoteUpdateDBRequest},
    },
    errors::{Error, Result},
    types::{LibraryId, NoteId},
    AppState,
};

async fn list(state: AppState, query: ListNotesQuery, scope: Option<LibraryId>) -> Result<Envelope<Vec<NoteResponse>>> {
    let filter = query.normalize(scope)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Notes::new(&mut conn);

    let notes = repo.list(&filter).await?;
    Ok(Envelope::ok(notes.into_iter().map(NoteResponse::from).collect()))
}

async fn create(state: AppState, create: NoteCreate, scope: Option<LibraryId>) -> Result<Envelope<NoteResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Notes::new(&mut conn);

    let note = repo.create_scoped(&NoteCreateDBRequest::from(create), scope).await?;
    Ok(Envelope::created(NoteResponse::from(note)))
}

fn not_found(id: NoteId) -> Error {
    Error::NotFound {
        resource: "Note".to_string(),
        id: id.to_string(),
    }
}

#[utoipa::path(
    get,
    path = "/notes",
    tag = "notes",
    summary = "List notes",
    params(ListNotesQuery),
    responses(
        (status = 200, description = "List of notes", body = Vec<NoteResponse>),
        (status = 400, description = "Invalid query parameters"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_notes(State(state): State<AppState>, Query(query): Query<ListNotesQuery>) -> Result<Envelope<Vec<NoteResponse>>> {
    list(state, query, None).await
}

#[utoipa::path(
    get,
    path = "/libraries/{id}/notes",
    tag = "notes",
    summary = "List notes of a library",
    params(ListNotesQuery, ("id" = LibraryId, Path, description = "Library ID")),
    responses(
        (status = 200, description = "Notes attached to the library", body = Vec<NoteResponse>),
        (status = 400, description = "Invalid query parameters"),
    )
)]
#[tracing::instrument(skip_all, fields(library_id = lid))]
pub async fn list_library_notes(
    State(state): State<AppState>,
    Path(lid): Path<LibraryId>,
    Query(query): Query<ListNotesQuery>,
) -> Result<Envelope<Vec<NoteResponse>>> {
    list(state, query, Some(lid)).await
}

#[utoipa::path(
    post,
    path = "/notes",
    tag = "notes",
    summary = "Create note",
    request_body = NoteCreate,
    responses(
        (status = 201, description = "Note created", body = NoteResponse),
        (status = 400, description = "Invalid request"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_note(State(state): State<AppState>, Json(body): Json<NoteCreate>) -> Result<Envelope<NoteResponse>> {
    create(state, body, None).await
}

#[utoipa::path(
    post,
    path = "/libraries/{id}/notes",
    tag = "notes",
    summary = "Create note attached to a library",
    request_body = NoteCreate,
    params(("id" = LibraryId, Path, description = "Library ID")),
    responses(
        (status = 201, description = "Note created and attached", body = NoteResponse),
        (status = 404, description = "Library not found"),
    )
)]
#[tracing::instrument(skip_all, fields(library_id = lid))]
pub async fn create_library_note(
    State(state): State<AppState>,
    Path(lid): Path<LibraryId>,
    Json(body): Json<NoteCreate>,
) -> Result<Envelope<NoteResponse>> {
    create(state, body, Some(lid)).await
}

#[utoipa::path(
    get,
    path = "/notes/{id}",
    tag = "notes",
    summary = "Get note",
    params(("id" = NoteId, Path, description = "Note ID")),
    responses(
        (status = 200, description = "Note details", body = NoteResponse),
        (status = 404, description = "Note not found"),
    )
)]
#[tracing::instrument(skip_all, fields(note_id = id))]
pub async fn get_note(State(state): State<AppState>, Path(id): Path<NoteId>) -> Result<Envelope<NoteResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Notes::new(&mut conn);

    match repo.get_by_id(id).await? {
        Some(note) => Ok(Envelope::ok(NoteResponse::from(note))),
        None => Err(not_found(id)),
    }
}

#[utoipa::path(
    get,
    path = "/libraries/{id}/notes/{nid}",
    tag = "notes",
    summary = "Get note within a library",
    params(
        ("id" = LibraryId, Path, description = "Library ID"),
        ("nid" = NoteId, Path, description = "Note ID"),
    ),
    responses(
        (status = 200, description = "Note details", body = NoteResponse),
        (status = 404, description = "Note not found or not attached to the library"),
    )
)]
#[tracing::instrument(skip_all, fields(library_id = lid, note_id = id))]
pub async fn get_library_note(
    State(state): State<AppState>,
    Path((lid, id)): Path<(LibraryId, NoteId)>,
) -> Result<Envelope<NoteResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Notes::new(&mut conn);

    match repo.get_scoped(id, Some(lid)).await? {
        Some(note) => Ok(Envelope::ok(NoteResponse::from(note))),
        None => Err(not_found(id)),
    }
}

#[utoipa::path(
    put,
    path = "/notes/{id}",
    tag = "notes",
    summary = "Update note",
    request_body = NoteUpdate,
    params(("id" = NoteId, Path, description = "Note ID")),
    responses(
        (status = 204, description = "Existing note updated"),
        (status = 201, description = "No note at this identity; one was created", body = NoteResponse),
        (status = 422, description = "Unusable payload"),
    )
)]
#[tracing::instrument(skip_all, fields(note_id = id))]
pub async fn update_note(State(state): State<AppState>, Path(id): Path<NoteId>, Json(update): Json<NoteUpdate>) -> Result<Response> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Notes::new(&mut conn);

    let outcome = repo.update(id, &NoteUpdateDBRequest::from(update)).await?;
    if outcome.existed {
        Ok(StatusCode::NO_CONTENT.into_response())
    } else {
        Ok(Envelope::created(NoteResponse::from(outcome.row)).into_response())
    }
}

#[utoipa::path(
    put,
    path = "/libraries/{id}/notes/{nid}",
    tag = "notes",
    summary = "Attach note to a library",
    params(
        ("id" = LibraryId, Path, description = "Library ID"),
        ("nid" = NoteId, Path, description = "Note ID"),
    ),
    responses(
        (status = 204, description = "Note attached"),
        (status = 404, description = "Library or note not found"),
    )
)]
#[tracing::instrument(skip_all, fields(library_id = lid, note_id = id))]
pub async fn attach_note(State(state): State<AppState>, Path((lid, id)): Path<(LibraryId, NoteId)>) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Notes::new(&mut conn);

    repo.add_to_library(lid, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/notes/{id}",
    tag = "notes",
    summary = "Delete note",
    params(("id" = NoteId, Path, description = "Note ID")),
    responses(
        (status = 204, description = "Note deleted"),
        (status = 404, description = "Note not found"),
    )
)]
#[tracing::instrument(skip_all, fields(note_id = id))]
pub async fn delete_note(State(state): State<AppState>, Path(id): Path<NoteId>) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Notes::new(&mut conn);

    if repo.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(id))
    }
}

#[utoipa::path(
    delete,
    path = "/libraries/{id}/notes/{nid}",
    tag = "notes",
    summary = "Detach note from a library",
    params(
        ("id" = LibraryId, Path, description = "Library ID"),
        ("nid" = NoteId, Path, description = "Note ID"),
    ),
    responses(
        (status = 204, description = "Note detached; the note itself survives"),
        (status = 404, description = "Note was not attached to the library"),
    )
)]
#[tracing::instrument(skip_all, fields(library_id = lid, note_id = id))]
pub async fn detach_note(State(state): State<AppState>, Path((lid, id)): Path<(LibraryId, NoteId)>) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Notes::new(&mut conn);

    if repo.remove_from_library(lid, id).await? > 0 {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(id))
    }
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{create_test_app, create_test_library, create_test_user};
    use serde_json::json;
    use sqlx::SqlitePool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_note_lifecycle(pool: SqlitePool) {
        let server = create_test_app(pool.clone()).await;
        let author = create_test_user(&pool, "alice").await;

        let response = server
            .post("/api/v1/notes")
            .json(&json!({"subject": "Router swap", "description": "Replaced the flaky router.", "author": author.id}))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        let id = response.json::<serde_json::Value>()["data"]["id"].as_i64().unwrap();

        let response = server.get(&format!("/api/v1/notes/{id}")).await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["data"]["subject"], "Router swap");
        assert_eq!(body["data"]["author"], author.id);

        let response = server
            .put(&format!("/api/v1/notes/{id}"))
            .json(&json!({"subject": "Router swap (done)"}))
            .await;
        response.assert_status(axum::http::StatusCode::NO_CONTENT);

        let response = server.delete(&format!("/api/v1/notes/{id}")).await;
        response.assert_status(axum::http::StatusCode::NO_CONTENT);
        let response = server.get(&format!("/api/v1/notes/{id}")).await;
        response.assert_status_not_found();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_scoped_notes(pool: SqlitePool) {
        let server = create_test_app(pool.clone()).await;
        let lid = create_test_library(&pool, "Central").await;
        let other = create_test_library(&pool, "Branch").await;

        // Created through the scoped route: attached in the same breath
        let response = server
            .post(&format!("/api/v1/libraries/{lid}/notes"))
            .json(&json!({"subject": "Outage"}))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        let id = response.json::<serde_json::Value>()["data"]["id"].as_i64().unwrap();

        // Plain note, attached to nothing
        server.post("/api/v1/notes").json(&json!({"subject": "Loose"})).await;

        let response = server.get(&format!("/api/v1/libraries/{lid}/notes")).await;
        let body: serde_json::Value = response.json();
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["subject"], "Outage");

        // Item lookup respects the scope
        let response = server.get(&format!("/api/v1/libraries/{lid}/notes/{id}")).await;
        response.assert_status_ok();
        let response = server.get(&format!("/api/v1/libraries/{other}/notes/{id}")).await;
        response.assert_status_not_found();

        // Attach to the second library, then detach from the first
        let response = server.put(&format!("/api/v1/libraries/{other}/notes/{id}")).await;
        response.assert_status(axum::http::StatusCode::NO_CONTENT);
        let response = server.delete(&format!("/api/v1/libraries/{lid}/notes/{id}")).await;
        response.assert_status(axum::http::StatusCode::NO_CONTENT);

        // Detaching again finds nothing, and the note itself survives
        let response = server.delete(&format!("/api/v1/libraries/{lid}/notes/{id}")).await;
        response.assert_status_not_found();
        let response = server.get(&format!("/api/v1/notes/{id}")).await;
        response.assert_status_ok();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_attach_to_missing_library(pool: SqlitePool) {
        let server = create_test_app(pool.clone()).await;

        let response = server.post("/api/v1/notes").json(&json!({"subject": "Orphan"})).await;
        let id = response.json::<serde_json::Value>()["data"]["id"].as_i64().unwrap();

        let response = server.put(&format!("/api/v1/libraries/999/notes/{id}")).await;
        response.assert_status_not_found();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_filtered_by_library_time_and_order(pool: SqlitePool) {
        let server = create_test_app(pool.clone()).await;
        let lid = create_test_library(&pool, "Central").await;

        for subject in ["first", "second", "third"] {
            server
                .post(&format!("/api/v1/libraries/{lid}/notes"))
                .json(&json!({"subject": subject}))
                .await;
        }

        // Notes for the library created on/after a past instant, newest first
        let response = server
            .get(&format!("/api/v1/notes?library={lid}&from=2024-01-01T00:00:00Z&asc=false"))
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        let subjects: Vec<_> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|n| n["subject"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(subjects, ["third", "second", "first"]);

        // A future lower bound excludes everything
        let response = server
            .get(&format!("/api/v1/notes?library={lid}&from=2124-01-01T00:00:00Z"))
            .await;
        let body: serde_json::Value = response.json();
        assert!(body["data"].as_array().unwrap().is_empty());

        // Bad timestamps are rejected before the repository runs
        let response = server.get("/api/v1/notes?from=yesterday").await;
        response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    }
}
