//! Database repository for measurement runs and their library associations.

use crate::api::models::query::Window;
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::{Repository, UpdateOutcome},
    models::runs::{RunCreateDBRequest, RunDBResponse, RunUpdateDBRequest},
};
use crate::types::{LibraryId, RunId};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection};
use tracing::instrument;

/// Columns a run listing may be ordered by
pub const SORTABLE: &[&str] = &["id", "test", "created_at", "updated_at"];

/// Filter for listing runs
#[derive(Debug, Clone, Default)]
pub struct RunFilter {
    pub window: Window,
    pub test: Option<String>,
    pub library: Option<LibraryId>,
}

// Database entity model; result is stored as raw JSON text
#[derive(Debug, Clone, FromRow)]
struct Run {
    pub id: RunId,
    pub test: String,
    pub result: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Run> for RunDBResponse {
    fn from(run: Run) -> Self {
        let result = run.result.map(|raw| {
            // Old clients occasionally uploaded bare strings; pass those
            // through rather than failing the whole read
            serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw))
        });
        Self {
            id: run.id,
            test: run.test,
            result,
            created_at: run.created_at,
            updated_at: run.updated_at,
        }
    }
}

pub struct Runs<'c> {
    db: &'c mut SqliteConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Runs<'c> {
    type CreateRequest = RunCreateDBRequest;
    type UpdateRequest = RunUpdateDBRequest;
    type Response = RunDBResponse;
    type Id = RunId;
    type Filter = RunFilter;

    #[instrument(skip(self, request), fields(test = %request.test), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        self.create_scoped(request, None).await
    }

    #[instrument(skip(self), fields(run_id = id), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let run = sqlx::query_as::<_, Run>("SELECT * FROM runs WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(run.map(RunDBResponse::from))
    }

    #[instrument(skip(self, filter), fields(start = filter.window.start, library = filter.library), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT runs.* FROM runs");

        if let Some(lid) = filter.library {
            query.push(" JOIN library_runs ON library_runs.rid = runs.id AND library_runs.lid = ");
            query.push_bind(lid);
        }

        query.push(" WHERE 1=1");

        if let Some(ref test) = filter.test {
            query.push(" AND runs.test = ");
            query.push_bind(test.clone());
        }

        filter.window.push_time_bounds(&mut query, "runs");
        filter.window.push_order_and_slice(&mut query, "runs");

        let runs = query.build_query_as::<Run>().fetch_all(&mut *self.db).await?;

        Ok(runs.into_iter().map(RunDBResponse::from).collect())
    }

    #[instrument(skip(self, request), fields(run_id = id), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<UpdateOutcome<Self::Response>> {
        let result = sqlx::query(
            r#"
            UPDATE runs SET
                test = COALESCE(?, test),
                result = COALESCE(?, result)
            WHERE id = ?
            "#,
        )
        .bind(&request.test)
        .bind(&request.result)
        .bind(id)
        .execute(&mut *self.db)
        .await?;

        if result.rows_affected() > 0 {
            let row = self.fetch_existing(id).await?;
            return Ok(UpdateOutcome { existed: true, row });
        }

        let test = request.test.clone().ok_or_else(|| DbError::Unprocessable {
            message: "Cannot create a run without a test identifier.".to_string(),
        })?;

        sqlx::query("INSERT INTO runs (id, test, result) VALUES (?, ?, ?)")
            .bind(id)
            .bind(&test)
            .bind(&request.result)
            .execute(&mut *self.db)
            .await?;

        let row = self.fetch_existing(id).await?;
        Ok(UpdateOutcome { existed: false, row })
    }

    #[instrument(skip(self), fields(run_id = id), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM runs WHERE id = ?")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

impl<'c> Runs<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    async fn fetch_existing(&mut self, id: RunId) -> Result<RunDBResponse> {
        let run = sqlx::query_as::<_, Run>("SELECT * FROM runs WHERE id = ?")
            .bind(id)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(RunDBResponse::from(run))
    }

    /// Create a run, optionally attaching it to a library (the scoped
    /// POST /libraries/{lid}/runs route used by measurement devices).
    #[instrument(skip(self, request), fields(test = %request.test, library_id = lid), err)]
    pub async fn create_scoped(&mut self, request: &RunCreateDBRequest, lid: Option<LibraryId>) -> Result<RunDBResponse> {
        let result = sqlx::query("INSERT INTO runs (test, result) VALUES (?, ?)")
            .bind(&request.test)
            .bind(&request.result)
            .execute(&mut *self.db)
            .await?;

        let id = result.last_insert_rowid();
        if let Some(lid) = lid {
            self.add_to_library(lid, id).await?;
        }

        self.fetch_existing(id).await
    }

    /// Exact-identity lookup, optionally restricted to runs attached to a
    /// library. A run outside the library reads as absent.
    #[instrument(skip(self), fields(run_id = id, library_id = lid), err)]
    pub async fn get_scoped(&mut self, id: RunId, lid: Option<LibraryId>) -> Result<Option<RunDBResponse>> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT runs.* FROM runs");
        if let Some(lid) = lid {
            query.push(" JOIN library_runs ON library_runs.rid = runs.id AND library_runs.lid = ");
            query.push_bind(lid);
        }
        query.push(" WHERE runs.id = ");
        query.push_bind(id);

        let run = query.build_query_as::<Run>().fetch_optional(&mut *self.db).await?;

        Ok(run.map(RunDBResponse::from))
    }

    /// Attach an existing run to a library.
    #[instrument(skip(self), fields(library_id = lid, run_id = id), err)]
    pub async fn add_to_library(&mut self, lid: LibraryId, id: RunId) -> Result<()> {
        match sqlx::query("INSERT INTO library_runs (lid, rid) VALUES (?, ?) ON CONFLICT DO NOTHING")
            .bind(lid)
            .bind(id)
            .execute(&mut *self.db)
            .await
        {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => {
                // Either the library or the run does not exist
                Err(DbError::NotFound)
            }
            Err(e) => Err(DbError::from(e)),
        }
    }

    /// Detach a run from a library, reporting how many join rows went away.
    #[instrument(skip(self), fields(library_id = lid, run_id = id), err)]
    pub async fn remove_from_library(&mut self, lid: LibraryId, id: RunId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM library_runs WHERE lid = ? AND rid = ?")
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
    use serde_json::json;
    use sqlx::SqlitePool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_round_trips_json_payload(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Runs::new(&mut conn);

        let payload = json!({"download_mbps": 94.2, "upload_mbps": 11.8, "min_rtt_ms": 12});
        let request = RunCreateDBRequest {
            test: "ndt7".to_string(),
            result: Some(payload.to_string()),
        };

        let created = repo.create(&request).await.unwrap();
        let fetched = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.test, "ndt7");
        assert_eq!(fetched.result, Some(payload));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_by_test_and_library(pool: SqlitePool) {
        let lid = create_test_library(&pool, "Main").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Runs::new(&mut conn);

        let ndt = repo
            .create_scoped(
                &RunCreateDBRequest {
                    test: "ndt7".to_string(),
                    result: None,
                },
                Some(lid),
            )
            .await
            .unwrap();
        repo.create(&RunCreateDBRequest {
            test: "speedtest".to_string(),
            result: None,
        })
        .await
        .unwrap();

        let filter = RunFilter {
            test: Some("ndt7".to_string()),
            ..Default::default()
        };
        let rows = repo.list(&filter).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, ndt.id);

        let filter = RunFilter {
            library: Some(lid),
            ..Default::default()
        };
        let rows = repo.list(&filter).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, ndt.id);

        let filter = RunFilter {
            test: Some("speedtest".to_string()),
            library: Some(lid),
            ..Default::default()
        };
        assert!(repo.list(&filter).await.unwrap().is_empty());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_and_association(pool: SqlitePool) {
        let lid = create_test_library(&pool, "Main").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Runs::new(&mut conn);

        let run = repo
            .create(&RunCreateDBRequest {
                test: "ndt7".to_string(),
                result: None,
            })
            .await
            .unwrap();

        let outcome = repo
            .update(
                run.id,
                &RunUpdateDBRequest {
                    result: Some(json!({"retried": true}).to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(outcome.existed);
        assert_eq!(outcome.row.test, "ndt7");
        assert_eq!(outcome.row.result, Some(json!({"retried": true})));

        repo.add_to_library(lid, run.id).await.unwrap();
        assert_eq!(repo.remove_from_library(lid, run.id).await.unwrap(), 1);
        assert_eq!(repo.remove_from_library(lid, run.id).await.unwrap(), 0);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_delete_semantics(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Runs::new(&mut conn);

        let run = repo
            .create(&RunCreateDBRequest {
                test: "ndt7".to_string(),
                result: None,
            })
            .await
            .unwrap();

        assert!(repo.delete(run.id).await.unwrap());
        assert!(!repo.delete(run.id).await.unwrap());
        assert!(repo.get_by_id(run.id).await.unwrap().is_none());
    }
}
