//! Test utilities shared across the crate's test modules.

use axum_test::TestServer;
use sqlx::SqlitePool;

use crate::{
    api::models::users::CurrentUser,
    auth::{
        password::{hash_string_with_params, Argon2Params},
        session,
    },
    config::{Config, DatabaseConfig},
    db::{
        handlers::{Libraries, Repository, Users},
        models::{
            libraries::LibraryCreateDBRequest,
            users::{UserCreateDBRequest, UserDBResponse},
        },
    },
    types::LibraryId,
    AppState,
};

/// Password every fixture user is created with
pub const TEST_PASSWORD: &str = "correct-horse-battery-staple";

pub fn create_test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        database: DatabaseConfig::Memory,
        admin_username: "admin".to_string(),
        admin_password: None,
        secret_key: Some("test-secret-key-for-testing-only".to_string()),
        auth: crate::config::AuthConfig {
            session: crate::config::SessionConfig {
                // Tests run over plain HTTP
                cookie_secure: false,
                ..Default::default()
            },
        },
        cors: crate::config::CorsConfig::default(),
    }
}

/// Build a test server over the full router, backed by the given pool.
pub async fn create_test_app(pool: SqlitePool) -> TestServer {
    let state = AppState {
        db: pool,
        config: create_test_config(),
    };
    let router = crate::build_router(state).expect("Failed to build router");
    TestServer::new(router).expect("Failed to create test server")
}

fn test_password_hash() -> String {
    // Minimum-cost parameters so fixtures don't dominate the test runtime;
    // verification reads the parameters back out of the hash
    let params = Argon2Params {
        memory_kib: 8,
        iterations: 1,
        parallelism: 1,
    };
    hash_string_with_params(TEST_PASSWORD, Some(params)).expect("Failed to hash test password")
}

pub async fn create_test_user(pool: &SqlitePool, username: &str) -> UserDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let mut repo = Users::new(&mut conn);

    repo.create(&UserCreateDBRequest {
        username: username.to_string(),
        password_hash: test_password_hash(),
        first_name: None,
        last_name: None,
        email: Some(format!("{username}@example.com")),
        location: None,
        role: Some(2),
    })
    .await
    .expect("Failed to create test user")
}

pub async fn create_test_library(pool: &SqlitePool, name: &str) -> LibraryId {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let mut repo = Libraries::new(&mut conn);

    let library = repo
        .create(&LibraryCreateDBRequest {
            name: name.to_string(),
            physical_address: None,
            shipping_address: None,
            timezone: None,
            coordinates: None,
            primary_contact_name: None,
            primary_contact_email: None,
            it_contact_name: None,
            it_contact_email: None,
            opening_hours: None,
            network_name: None,
            isp: None,
            contracted_speed_upload: None,
            contracted_speed_download: None,
            bandwidth_cap_upload: None,
            bandwidth_cap_download: None,
        })
        .await
        .expect("Failed to create test library");

    library.id
}

/// Cookie header value carrying a fresh session token for the given user.
pub fn session_cookie(user: &UserDBResponse) -> String {
    let config = create_test_config();
    let token =
        session::create_session_token(&CurrentUser::from(user.clone()), &config, false).expect("Failed to create session token");
    format!("{}={token}", config.auth.session.cookie_name)
}
