//! Database repository for notes and their library associations.

use crate::api::models::query::Window;
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::{Repository, UpdateOutcome},
    models::notes::{NoteCreateDBRequest, NoteDBResponse, NoteUpdateDBRequest},
};
use crate::types::{LibraryId, NoteId, UserId};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection};
use tracing::instrument;

/// Columns a note listing may be ordered by
pub const SORTABLE: &[&str] = &["id", "subject", "author", "created_at", "updated_at"];

/// Filter for listing notes
#[derive(Debug, Clone, Default)]
pub struct NoteFilter {
    pub window: Window,
    pub author: Option<UserId>,
    pub library: Option<LibraryId>,
}

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct Note {
    pub id: NoteId,
    pub subject: String,
    pub description: Option<String>,
    pub author: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Note> for NoteDBResponse {
    fn from(note: Note) -> Self {
        Self {
            id: note.id,
            subject: note.subject,
            description: note.description,
            author: note.author,
            created_at: note.created_at,
            updated_at: note.updated_at,
        }
    }
}

pub struct Notes<'c> {
    db: &'c mut SqliteConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Notes<'c> {
    type CreateRequest = NoteCreateDBRequest;
    type UpdateRequest = NoteUpdateDBRequest;
    type Response = NoteDBResponse;
    type Id = NoteId;
    type Filter = NoteFilter;

    #[instrument(skip(self, request), fields(subject = %request.subject), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        self.create_scoped(request, None).await
    }

    #[instrument(skip(self), fields(note_id = id), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        self.get_scoped(id, None).await
    }

    #[instrument(skip(self, filter), fields(start = filter.window.start, library = filter.library), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT notes.* FROM notes");

        if let Some(lid) = filter.library {
            query.push(" JOIN library_notes ON library_notes.nid = notes.id AND library_notes.lid = ");
            query.push_bind(lid);
        }

        query.push(" WHERE 1=1");

        if let Some(author) = filter.author {
            query.push(" AND notes.author = ");
            query.push_bind(author);
        }

        filter.window.push_time_bounds(&mut query, "notes");
        filter.window.push_order_and_slice(&mut query, "notes");

        let notes = query.build_query_as::<Note>().fetch_all(&mut *self.db).await?;

        Ok(notes.into_iter().map(NoteDBResponse::from).collect())
    }

    #[instrument(skip(self, request), fields(note_id = id), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<UpdateOutcome<Self::Response>> {
        let result = sqlx::query(
            r#"
            UPDATE notes SET
                subject = COALESCE(?, subject),
                description = COALESCE(?, description),
                author = COALESCE(?, author)
            WHERE id = ?
            "#,
        )
        .bind(&request.subject)
        .bind(&request.description)
        .bind(request.author)
        .bind(id)
        .execute(&mut *self.db)
        .await?;

        if result.rows_affected() > 0 {
            let row = self.fetch_existing(id).await?;
            return Ok(UpdateOutcome { existed: true, row });
        }

        let subject = request.subject.clone().ok_or_else(|| DbError::Unprocessable {
            message: "Cannot create a note without a subject.".to_string(),
        })?;

        sqlx::query("INSERT INTO notes (id, subject, description, author) VALUES (?, ?, ?, ?)")
            .bind(id)
            .bind(&subject)
            .bind(&request.description)
            .bind(request.author)
            .execute(&mut *self.db)
            .await?;

        let row = self.fetch_existing(id).await?;
        Ok(UpdateOutcome { existed: false, row })
    }

    #[instrument(skip(self), fields(note_id = id), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM notes WHERE id = ?")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

impl<'c> Notes<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    async fn fetch_existing(&mut self, id: NoteId) -> Result<NoteDBResponse> {
        let note = sqlx::query_as::<_, Note>("SELECT * FROM notes WHERE id = ?")
            .bind(id)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(NoteDBResponse::from(note))
    }

    /// Create a note, optionally associating it with a library in the same
    /// breath (the scoped POST /libraries/{lid}/notes route).
    #[instrument(skip(self, request), fields(subject = %request.subject, library_id = lid), err)]
    pub async fn create_scoped(&mut self, request: &NoteCreateDBRequest, lid: Option<LibraryId>) -> Result<NoteDBResponse> {
        let result = sqlx::query("INSERT INTO notes (subject, description, author) VALUES (?, ?, ?)")
            .bind(&request.subject)
            .bind(&request.description)
            .bind(request.author)
            .execute(&mut *self.db)
            .await?;

        let id = result.last_insert_rowid();
        if let Some(lid) = lid {
            self.add_to_library(lid, id).await?;
        }

        self.fetch_existing(id).await
    }

    /// Exact-identity lookup, optionally restricted to notes attached to a
    /// library. A note outside the library reads as absent.
    #[instrument(skip(self), fields(note_id = id, library_id = lid), err)]
    pub async fn get_scoped(&mut self, id: NoteId, lid: Option<LibraryId>) -> Result<Option<NoteDBResponse>> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT notes.* FROM notes");
        if let Some(lid) = lid {
            query.push(" JOIN library_notes ON library_notes.nid = notes.id AND library_notes.lid = ");
            query.push_bind(lid);
        }
        query.push(" WHERE notes.id = ");
        query.push_bind(id);

        let note = query.build_query_as::<Note>().fetch_optional(&mut *self.db).await?;

        Ok(note.map(NoteDBResponse::from))
    }

    /// Attach an existing note to a library.
    #[instrument(skip(self), fields(library_id = lid, note_id = id), err)]
    pub async fn add_to_library(&mut self, lid: LibraryId, id: NoteId) -> Result<()> {
        match sqlx::query("INSERT INTO library_notes (lid, nid) VALUES (?, ?) ON CONFLICT DO NOTHING")
            .bind(lid)
            .bind(id)
            .execute(&mut *self.db)
            .await
        {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => {
                // Either the library or the note does not exist
                Err(DbError::NotFound)
            }
            Err(e) => Err(DbError::from(e)),
        }
    }

    /// Detach a note from a library, reporting how many join rows went away.
    #[instrument(skip(self), fields(library_id = lid, note_id = id), err)]
    pub async fn remove_from_library(&mut self, lid: LibraryId, id: NoteId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM library_notes WHERE lid = ? AND nid = ?")
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
    use crate::api::models::query::ListParams;
    use crate::test_utils::{create_test_library, create_test_user};
    use sqlx::SqlitePool;

    fn about(subject: &str) -> NoteCreateDBRequest {
        NoteCreateDBRequest {
            subject: subject.to_string(),
            description: None,
            author: None,
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_and_get_round_trip(pool: SqlitePool) {
        let user = create_test_user(&pool, "author").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Notes::new(&mut conn);

        let request = NoteCreateDBRequest {
            subject: "Router replaced".to_string(),
            description: Some("Swapped the failing unit".to_string()),
            author: Some(user.id),
        };

        let created = repo.create(&request).await.unwrap();
        let fetched = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.subject, "Router replaced");
        assert_eq!(fetched.description.as_deref(), Some("Swapped the failing unit"));
        assert_eq!(fetched.author, Some(user.id));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_scoped_create_attaches_to_library(pool: SqlitePool) {
        let lid = create_test_library(&pool, "Main").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Notes::new(&mut conn);

        let note = repo.create_scoped(&about("On-site visit"), Some(lid)).await.unwrap();

        // Visible through the scoped lookup, absent from other scopes
        assert!(repo.get_scoped(note.id, Some(lid)).await.unwrap().is_some());
        assert!(repo.get_scoped(note.id, Some(lid + 1)).await.unwrap().is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_filters(pool: SqlitePool) {
        let alice = create_test_user(&pool, "alice").await;
        let bob = create_test_user(&pool, "bob").await;
        let lid = create_test_library(&pool, "Main").await;

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Notes::new(&mut conn);

        let n1 = repo
            .create_scoped(
                &NoteCreateDBRequest {
                    subject: "first".to_string(),
                    description: None,
                    author: Some(alice.id),
                },
                Some(lid),
            )
            .await
            .unwrap();
        repo.create(&NoteCreateDBRequest {
            subject: "second".to_string(),
            description: None,
            author: Some(bob.id),
        })
        .await
        .unwrap();

        // Author filter
        let filter = NoteFilter {
            author: Some(alice.id),
            ..Default::default()
        };
        let rows = repo.list(&filter).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, n1.id);

        // Library scoping joins the association table
        let filter = NoteFilter {
            library: Some(lid),
            ..Default::default()
        };
        let rows = repo.list(&filter).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, n1.id);

        // No match is an empty list, never an error
        let filter = NoteFilter {
            author: Some(bob.id),
            library: Some(lid),
            ..Default::default()
        };
        assert!(repo.list(&filter).await.unwrap().is_empty());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_time_bounds(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Notes::new(&mut conn);

        let old = repo.create(&about("old")).await.unwrap();
        let new = repo.create(&about("new")).await.unwrap();

        // Backdate the first note past the cutoff
        sqlx::query("UPDATE notes SET created_at = '2020-01-01T00:00:00.000Z' WHERE id = ?")
            .bind(old.id)
            .execute(&mut *conn)
            .await
            .unwrap();

        let mut repo = Notes::new(&mut conn);
        let window = ListParams {
            from: Some("2024-01-01T00:00:00Z".to_string()),
            asc: Some(false),
            ..Default::default()
        }
        .normalize(SORTABLE)
        .unwrap();
        let rows = repo
            .list(&NoteFilter {
                window,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, new.id);

        // `to` is exclusive of the bound itself
        let window = ListParams {
            to: Some("2020-01-01T00:00:00Z".to_string()),
            ..Default::default()
        }
        .normalize(SORTABLE)
        .unwrap();
        let rows = repo
            .list(&NoteFilter {
                window,
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_existing_and_missing(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Notes::new(&mut conn);

        let created = repo.create(&about("draft")).await.unwrap();
        let outcome = repo
            .update(
                created.id,
                &NoteUpdateDBRequest {
                    description: Some("expanded".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(outcome.existed);
        assert_eq!(outcome.row.subject, "draft");
        assert_eq!(outcome.row.description.as_deref(), Some("expanded"));

        let outcome = repo
            .update(
                77,
                &NoteUpdateDBRequest {
                    subject: Some("fresh".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(!outcome.existed);
        assert_eq!(outcome.row.id, 77);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_association_lifecycle(pool: SqlitePool) {
        let lid = create_test_library(&pool, "Main").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Notes::new(&mut conn);

        let note = repo.create(&about("loose")).await.unwrap();
        repo.add_to_library(lid, note.id).await.unwrap();
        // Attaching twice is a no-op
        repo.add_to_library(lid, note.id).await.unwrap();

        assert_eq!(repo.remove_from_library(lid, note.id).await.unwrap(), 1);
        assert_eq!(repo.remove_from_library(lid, note.id).await.unwrap(), 0);

        // Attaching to a missing library is refused
        let err = repo.add_to_library(lid + 50, note.id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_delete_missing_then_lookup(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Notes::new(&mut conn);

        assert!(!repo.delete(1234).await.unwrap());
        assert!(repo.get_by_id(1234).await.unwrap().is_none());
    }
}
