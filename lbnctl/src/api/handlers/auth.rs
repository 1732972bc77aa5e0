//! Login, logout, and session introspection.

use axum::{
    extract::State,
    http::{header::SET_COOKIE, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    api::models::{
        auth::LoginRequest,
        envelope::Envelope,
        users::{CurrentUser, UserResponse},
    },
    auth::{password, session},
    db::handlers::Users,
    errors::{Error, Result},
    AppState,
};

/// Successful login: the signed-in user plus the session cookie.
pub struct LoginResponse {
    user: UserResponse,
    cookie: String,
}

impl IntoResponse for LoginResponse {
    fn into_response(self) -> Response {
        ([(SET_COOKIE, self.cookie)], Envelope::ok(self.user)).into_response()
    }
}

/// Build the session cookie string.
///
/// Without `remember` the cookie carries no Max-Age and dies with the
/// browser session; with it, the cookie lives as long as the extended token.
fn create_session_cookie(token: &str, config: &crate::config::Config, remember: bool) -> String {
    let session = &config.auth.session;
    let mut cookie = format!(
        "{}={token}; Path=/; HttpOnly; SameSite={}",
        session.cookie_name, session.cookie_same_site
    );
    if session.cookie_secure {
        cookie.push_str("; Secure");
    }
    if remember {
        cookie.push_str(&format!("; Max-Age={}", session.remember_expiry.as_secs()));
    }
    cookie
}

#[utoipa::path(
    post,
    path = "/login",
    tag = "authentication",
    summary = "Log in",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful; the session cookie is set", body = UserResponse),
        (status = 401, description = "Invalid credentials"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<LoginResponse> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Users::new(&mut conn);

    // The same response for unknown users and wrong passwords, so usernames
    // cannot be enumerated through the login endpoint
    let user = repo
        .get_by_username(&request.username)
        .await?
        .ok_or_else(|| Error::Unauthenticated {
            message: Some("Invalid username or password".to_string()),
        })?;

    // Verify password on a blocking thread to avoid stalling the runtime
    let password = request.password.clone();
    let hash = user.password_hash.clone();
    let is_valid = tokio::task::spawn_blocking(move || password::verify_string(&password, &hash))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password verification task: {e}"),
        })??;

    if !is_valid {
        return Err(Error::Unauthenticated {
            message: Some("Invalid username or password".to_string()),
        });
    }

    let current_user = CurrentUser::from(user.clone());
    let token = session::create_session_token(&current_user, &state.config, request.remember)?;
    let cookie = create_session_cookie(&token, &state.config, request.remember);

    Ok(LoginResponse {
        user: UserResponse::from(user),
        cookie,
    })
}

#[utoipa::path(
    get,
    path = "/logout",
    tag = "authentication",
    summary = "Log out",
    responses(
        (status = 204, description = "Session cookie cleared"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn logout(State(state): State<AppState>) -> Response {
    // An expired cookie under the same name clears the session client-side;
    // the token itself simply ages out, there is no server-side state
    let session = &state.config.auth.session;
    let mut cookie = format!(
        "{}=; Path=/; HttpOnly; SameSite={}; Max-Age=0",
        session.cookie_name, session.cookie_same_site
    );
    if session.cookie_secure {
        cookie.push_str("; Secure");
    }

    ([(SET_COOKIE, cookie)], StatusCode::NO_CONTENT).into_response()
}

#[utoipa::path(
    get,
    path = "/authenticated",
    tag = "authentication",
    summary = "Current session",
    responses(
        (status = 200, description = "The authenticated user", body = CurrentUser),
        (status = 401, description = "No valid session"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn authenticated(user: CurrentUser) -> Envelope<CurrentUser> {
    Envelope::ok(user)
}
