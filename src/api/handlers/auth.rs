//! Authentication endpoints: login, logout, and identity introspection.

use axum::{
    Json,
    extract::State,
    http::header::SET_COOKIE,
    response::{AppendHeaders, IntoResponse, Response},
};

use crate::{
    AppState,
    api::models::{
        auth::{LoginRequest, LoginResponse},
        users::{CurrentUser, UserResponse},
    },
    auth::{password, session},
    db::handlers::{Repository as _, Users},
    errors::{Error, Result},
};

fn invalid_credentials() -> Error {
    Error::Unauthenticated {
        message: Some("Invalid username or password".to_string()),
    }
}

fn session_cookie(token: &str, config: &crate::config::Config) -> String {
    let native = &config.auth.native;
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        native.cookie_name,
        token,
        native.jwt_expiry.as_secs()
    )
}

/// Login with username and password
///
/// Sets the session cookie on success.
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Native authentication is disabled"),
        (status = 401, description = "Invalid credentials"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<Response> {
    if !state.config.auth.native.enabled {
        return Err(Error::BadRequest {
            message: "Native authentication is disabled".to_string(),
        });
    }

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut pool_conn);

    let user = user_repo
        .get_user_by_username(&request.username)
        .await?
        .ok_or_else(invalid_credentials)?;

    let password_hash = user.password_hash.clone().ok_or_else(invalid_credentials)?;

    // Verify on a blocking thread, argon2 is deliberately slow
    let candidate = request.password.clone();
    let is_valid = tokio::task::spawn_blocking(move || password::verify_string(&candidate, &password_hash))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password verification task: {e}"),
        })??;

    if !is_valid {
        return Err(invalid_credentials());
    }

    let user_response = UserResponse::from(user);
    let current_user: CurrentUser = user_response.clone().into();
    let token = session::create_session_token(&current_user, &state.config)?;
    let cookie = session_cookie(&token, &state.config);

    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(LoginResponse { user: user_response }),
    )
        .into_response())
}

/// Logout
///
/// Clears the session cookie.
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "authentication",
    responses(
        (status = 200, description = "Logout successful"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn logout(State(state): State<AppState>) -> Response {
    let cookie = format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
        state.config.auth.native.cookie_name
    );

    (
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(serde_json::json!({"message": "Logged out"})),
    )
        .into_response()
}

/// Get the calling user's identity
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "authentication",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Not authenticated"),
    ),
    security(("session_cookie" = []), ("proxy_header" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn me(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<UserResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut pool_conn);

    let user = user_repo.get_by_id(current_user.id).await?.ok_or_else(|| Error::NotFound {
        resource: "User".to_string(),
        id: current_user.id.to_string(),
    })?;

    Ok(Json(UserResponse::from(user)))
}
