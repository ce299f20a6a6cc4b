use axum::{Json, extract::State};

use crate::{
    AppState,
    api::{
        models::{
            auth::{AuthUser, LoginRequest, LoginResponse, MessageResponse},
            users::CurrentUser,
        },
        validation::{JsonBody, Validator},
    },
    auth::{password, session},
    errors::{Error, Result},
};

fn invalid_credentials() -> Error {
    Error::Unauthenticated {
        message: Some("Invalid credentials".to_string()),
    }
}

/// Login with username and password
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    tag = "authentication",
    summary = "Log in",
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Missing username or password", body = crate::errors::ValidationErrorResponse),
        (status = 401, description = "Invalid credentials", body = crate::errors::ErrorResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, JsonBody(request): JsonBody<LoginRequest>) -> Result<Json<LoginResponse>> {
    let mut v = Validator::new();
    let username = v.required("username", request.username.as_deref(), "Username is required");
    let password = v.required_raw("password", request.password.as_deref(), "Password is required");
    v.finish()?;
    let (username, password) = (username.unwrap_or_default(), password.unwrap_or_default());

    let mut conn = state.db.acquire().await?;
    let user = conn.users().get_by_username(&username).await?.ok_or_else(invalid_credentials)?;

    // Verify on a blocking thread to avoid stalling the async runtime
    let password_hash = user.password_hash.clone();
    let is_valid = tokio::task::spawn_blocking(move || password::verify_string(&password, &password_hash))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password verification task: {e}"),
        })??;

    if !is_valid {
        tracing::info!(username = %username, "Rejected login");
        return Err(invalid_credentials());
    }

    let token = session::create_session_token(&CurrentUser::from(&user), &state.config)?;
    tracing::info!(user_id = user.id, role = ?user.role, "User logged in");

    Ok(Json(LoginResponse {
        token,
        user: AuthUser::from(user),
    }))
}

/// Get the account behind the presented token
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "authentication",
    summary = "Current account",
    responses(
        (status = 200, description = "Current account", body = AuthUser),
        (status = 401, description = "Missing token", body = crate::errors::ErrorResponse),
        (status = 403, description = "Invalid or expired token", body = crate::errors::ErrorResponse),
        (status = 404, description = "Account no longer exists", body = crate::errors::ErrorResponse),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn me(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<AuthUser>> {
    let mut conn = state.db.acquire().await?;
    let user = conn.users().get_by_id(current_user.id).await?.ok_or_else(|| Error::NotFound {
        resource: "User".to_string(),
        id: current_user.id.to_string(),
    })?;

    Ok(Json(AuthUser::from(user)))
}

/// Log out. Tokens are stateless, so this only acknowledges; the client drops its token.
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "authentication",
    summary = "Log out",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, description = "Missing token", body = crate::errors::ErrorResponse),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn logout(current_user: CurrentUser) -> Json<MessageResponse> {
    tracing::debug!(user_id = current_user.id, "User logged out");
    Json(MessageResponse::new("Logout successful"))
}
