//! # lbnctl: Control Backend for the Library Broadband Measurement Network
//!
//! `lbnctl` is the administrative backend of a broadband measurement network
//! deployed across public libraries. It exposes a REST API over the network's
//! inventory - libraries, the measurement devices installed at them, the
//! measurement runs those devices upload, free-form operator notes, and the
//! dashboard user accounts - backed by an embedded sqlite database.
//!
//! ## Overview
//!
//! Field teams install small measurement devices at participating libraries;
//! the devices periodically run speed tests and upload the results. Operators
//! use the admin dashboard (a separate single-page application) to register
//! libraries and devices, review measurement runs, leave notes, and maintain
//! the per-library IP allowlists used by the network's access control.
//! This crate serves the JSON API behind that dashboard.
//!
//! ### Request Flow
//!
//! A request enters through an Axum handler ([`api::handlers`]), which
//! normalizes query parameters into a typed window descriptor
//! ([`api::models::query`]), delegates to a repository
//! ([`db::handlers`]) that builds a parameterized sqlite query, and shapes
//! the result into the uniform response envelope
//! ([`api::models::envelope`]). Errors funnel through [`errors::Error`],
//! which converts to the envelope's error shape at the boundary.
//!
//! Browser sessions are JWT cookies created by `POST /api/v1/login`
//! ([`auth`]); per-route authorization (which user may touch which library)
//! is the deployment's concern, enforced by middleware in front of this
//! router.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use lbnctl::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = lbnctl::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     lbnctl::telemetry::init_telemetry()?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Database Setup
//!
//! Migrations are embedded and run automatically on startup:
//!
//! ```no_run
//! # use sqlx::SqlitePool;
//! # async fn example(pool: SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
//! lbnctl::migrator().run(&pool).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
mod openapi;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub mod test_utils;

use axum::{
    http::HeaderValue,
    routing::get,
    Router,
};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{info, instrument, warn, Level};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::{
    auth::password,
    db::handlers::{Repository, Users},
    db::models::users::{UserCreateDBRequest, UserUpdateDBRequest},
    openapi::ApiDoc,
};

pub use config::Config;
pub use types::{DeviceId, LibraryId, NoteId, RunId, UserId};

/// Role value granted to the bootstrapped admin account
const ADMIN_ROLE: i64 = 1;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Config,
}

/// Get the lbnctl database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create the initial admin user if it doesn't exist.
///
/// Idempotent: creates the admin account on first startup, or resets its
/// password when one is configured, so a fresh deployment (or a locked-out
/// operator) can always reach the dashboard. Without a configured password
/// no account is created - the users table requires a credential.
///
/// Returns the user ID of the created or existing admin user, if any.
#[instrument(skip_all)]
pub async fn create_initial_admin_user(username: &str, password: Option<&str>, db: &SqlitePool) -> anyhow::Result<Option<UserId>> {
    let password_hash = password.map(password::hash_string).transpose()?;

    let mut conn = db.acquire().await?;
    let mut repo = Users::new(&mut conn);

    if let Some(existing) = repo.get_by_username(username).await? {
        if let Some(password_hash) = password_hash {
            repo.update(
                existing.id,
                &UserUpdateDBRequest {
                    password_hash: Some(password_hash),
                    ..Default::default()
                },
            )
            .await?;
            info!("Reset password of admin user '{username}'");
        }
        return Ok(Some(existing.id));
    }

    let Some(password_hash) = password_hash else {
        warn!("No admin_password configured and user '{username}' does not exist; skipping admin bootstrap");
        return Ok(None);
    };

    let created = repo
        .create(&UserCreateDBRequest {
            username: username.to_string(),
            password_hash,
            first_name: None,
            last_name: None,
            email: None,
            location: None,
            role: Some(ADMIN_ROLE),
        })
        .await?;

    info!("Created initial admin user '{username}'");
    Ok(Some(created.id))
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let origin = if config.cors.allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in &config.cors.allowed_origins {
            origins.push(origin.parse::<HeaderValue>()?);
        }
        AllowOrigin::list(origins)
    };

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(config.cors.allow_credentials))
}

/// Build the application router with all endpoints and middleware.
///
/// The admin API is nested under `/api/v1`; `/healthz` and the API docs sit
/// at the root. Authorization middleware is deployment-specific and wraps
/// the returned router from the outside.
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    use api::handlers::{auth, devices, libraries, notes, runs, users};

    let api_routes = Router::new()
        // Authentication
        .route("/login", axum::routing::post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/authenticated", get(auth::authenticated))
        // Libraries and their IP allowlists
        .route("/libraries", get(libraries::list_libraries).post(libraries::create_library))
        .route(
            "/libraries/{id}",
            get(libraries::get_library)
                .put(libraries::update_library)
                .delete(libraries::delete_library),
        )
        .route("/libraries/{id}/ip", get(libraries::list_library_ips))
        .route(
            "/libraries/{id}/ip/{address}",
            get(libraries::get_library_ip)
                .post(libraries::create_library_ip)
                .delete(libraries::delete_library_ip),
        )
        // Notes, standalone and library-scoped
        .route("/notes", get(notes::list_notes).post(notes::create_note))
        .route(
            "/notes/{id}",
            get(notes::get_note).put(notes::update_note).delete(notes::delete_note),
        )
        .route(
            "/libraries/{id}/notes",
            get(notes::list_library_notes).post(notes::create_library_note),
        )
        .route(
            "/libraries/{id}/notes/{nid}",
            get(notes::get_library_note).put(notes::attach_note).delete(notes::detach_note),
        )
        // Runs, standalone and library-scoped
        .route("/runs", get(runs::list_runs).post(runs::create_run))
        .route("/runs/{id}", get(runs::get_run).put(runs::update_run).delete(runs::delete_run))
        .route("/libraries/{id}/runs", get(runs::list_library_runs).post(runs::create_library_run))
        .route(
            "/libraries/{id}/runs/{rid}",
            get(runs::get_library_run).put(runs::attach_run).delete(runs::detach_run),
        )
        // Devices, standalone and library-scoped
        .route("/devices", get(devices::list_devices).post(devices::create_device))
        .route(
            "/devices/{id}",
            get(devices::get_device).put(devices::update_device).delete(devices::delete_device),
        )
        .route(
            "/libraries/{id}/devices",
            get(devices::list_library_devices).post(devices::create_library_device),
        )
        .route(
            "/libraries/{id}/devices/{did}",
            get(devices::get_library_device)
                .put(devices::attach_device)
                .delete(devices::detach_device),
        )
        // Users
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/{id}",
            get(users::get_user).put(users::update_user).delete(users::delete_user),
        )
        .with_state(state.clone());

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .nest("/api/v1", api_routes)
        .merge(Scalar::with_url("/api/docs", ApiDoc::openapi()));

    let cors_layer = create_cors_layer(&state.config)?;

    let router = router.layer(cors_layer).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Main application struct that owns all resources and lifecycle.
///
/// # Lifecycle
///
/// 1. **Create**: [`Application::new`] connects the database, runs
///    migrations, and bootstraps the admin user
/// 2. **Serve**: [`Application::serve`] binds a TCP port and handles
///    requests until the shutdown future resolves
pub struct Application {
    router: Router,
    config: Config,
    pool: SqlitePool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        tracing::debug!("Starting control backend with configuration: {:#?}", config);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.database.max_connections())
            .connect_with(config.database.connect_options())
            .await?;

        migrator().run(&pool).await?;

        create_initial_admin_user(&config.admin_username, config.admin_password.as_deref(), &pool).await?;

        let state = AppState {
            db: pool.clone(),
            config: config.clone(),
        };
        let router = build_router(state)?;

        Ok(Self { router, config, pool })
    }

    /// Start serving the application until `shutdown` resolves
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Control backend listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::create_initial_admin_user;
    use crate::auth::password;
    use crate::db::handlers::{Repository, Users};
    use crate::test_utils::create_test_app;
    use sqlx::SqlitePool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_healthz(pool: SqlitePool) {
        let server = create_test_app(pool).await;

        let response = server.get("/healthz").await;
        response.assert_status_ok();
        response.assert_text("OK");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_unknown_route_is_plain_404(pool: SqlitePool) {
        let server = create_test_app(pool).await;

        let response = server.get("/api/v1/nonsense").await;
        response.assert_status_not_found();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_admin_bootstrap_is_idempotent(pool: SqlitePool) {
        // No password, no user: nothing is created
        let none = create_initial_admin_user("admin", None, &pool).await.unwrap();
        assert!(none.is_none());

        let first = create_initial_admin_user("admin", Some("initial-password"), &pool)
            .await
            .unwrap()
            .unwrap();
        let second = create_initial_admin_user("admin", Some("rotated-password"), &pool)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first, second);

        // The second call rotated the stored credential
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);
        let admin = repo.get_by_username("admin").await.unwrap().unwrap();
        assert!(password::verify_string("rotated-password", &admin.password_hash).unwrap());
        assert!(!password::verify_string("initial-password", &admin.password_hash).unwrap());

        // Existing user without a configured password is left untouched
        let third = create_initial_admin_user("admin", None, &pool).await.unwrap().unwrap();
        assert_eq!(first, third);
        let admin = repo.get_by_username("admin").await.unwrap().unwrap();
        assert!(password::verify_string("rotated-password", &admin.password_hash).unwrap());
    }
}
