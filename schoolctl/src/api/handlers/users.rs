use axum::{
    Json,
    extract::State,
    http::StatusCode,
};

use super::not_found_as;
use crate::{
    AppState,
    api::{
        models::{
            auth::MessageResponse,
            users::{ListUsersQuery, Role, UserCreate, UserResponse, UserUpdate},
        },
        validation::{JsonBody, PathParam, QueryParams, TEXT_MAX, USERNAME_MAX, Validator, parse_enum},
    },
    auth::{
        password::{self, Argon2Params},
        permissions::{AdminUser, RequiresRole},
    },
    config::PasswordConfig,
    db::models::users::{UserCreateDBRequest, UserFilter, UserUpdateDBRequest},
    errors::{Error, Result},
    types::UserId,
};

fn user_not_found(id: UserId) -> Error {
    Error::NotFound {
        resource: "User".to_string(),
        id: id.to_string(),
    }
}

fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
                && domain.split('.').count() > 1
                && domain.split('.').all(|part| !part.is_empty())
        }
        None => false,
    }
}

/// Passwords are stored exactly as sent, so only the length and an all-whitespace value are
/// rejected.
fn check_password(v: &mut Validator, password: &str, rules: &PasswordConfig) {
    let length = password.chars().count();
    v.check(!password.trim().is_empty() || length == 0, "password", "Password cannot be blank");
    v.check(
        length >= rules.min_length,
        "password",
        &format!("Password must be at least {} characters", rules.min_length),
    );
    v.check(
        length <= rules.max_length,
        "password",
        &format!("Password must be at most {} characters", rules.max_length),
    );
}

async fn hash_password(password: String, params: Argon2Params) -> Result<String> {
    tokio::task::spawn_blocking(move || password::hash_string_with_params(&password, Some(params)))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password hashing task: {e}"),
        })?
}

#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    summary = "List users",
    params(ListUsersQuery),
    responses(
        (status = 200, description = "Staff accounts", body = [UserResponse]),
        (status = 403, description = "Requires admin role"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_users(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ListUsersQuery>,
    _: AdminUser,
) -> Result<Json<Vec<UserResponse>>> {
    let mut conn = state.db.acquire().await?;
    let users = conn.users().list(&UserFilter { role: query.role }).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    summary = "Get user",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "Staff account", body = UserResponse),
        (status = 403, description = "Requires admin role"),
        (status = 404, description = "User not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = id))]
pub async fn get_user(State(state): State<AppState>, PathParam(id): PathParam<UserId>, _: AdminUser) -> Result<Json<UserResponse>> {
    let mut conn = state.db.acquire().await?;
    let user = conn.users().get_by_id(id).await?.ok_or_else(|| user_not_found(id))?;
    Ok(Json(UserResponse::from(user)))
}

#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    summary = "Create user",
    request_body = UserCreate,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 400, description = "Invalid fields, or username/email taken"),
        (status = 403, description = "Requires admin role"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_user(
    State(state): State<AppState>,
    _: AdminUser,
    JsonBody(body): JsonBody<UserCreate>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    let rules = &state.config.auth.password;
    let mut v = Validator::new();
    let username = v.required("username", body.username.as_deref(), "Username is required");
    v.max_chars("username", body.username.as_deref(), USERNAME_MAX, "Username");
    let email = v.parse_required("email", body.email.as_deref(), |e| is_valid_email(e).then(|| e.to_string()), "Valid email is required");
    v.max_chars("email", body.email.as_deref(), TEXT_MAX, "Email");
    match body.password.as_deref() {
        Some(password) => check_password(&mut v, password, rules),
        None => v.error("password", &format!("Password must be at least {} characters", rules.min_length)),
    }
    let role = v.parse_required("role", body.role.as_deref(), parse_enum::<Role>, "Role must be admin or teacher");
    v.finish()?;

    let (username, email) = (username.unwrap_or_default(), email.unwrap_or_default());
    let mut conn = state.db.acquire().await?;
    if conn.users().exists_with_username_or_email(&username, &email).await? {
        return Err(Error::BadRequest {
            message: "Username or email already exists".to_string(),
        });
    }

    let password_hash = hash_password(body.password.unwrap_or_default(), Argon2Params::from(rules)).await?;
    let request = UserCreateDBRequest {
        username,
        email,
        role: role.unwrap_or(Role::Teacher),
        password_hash,
    };
    let user = conn.users().create(&request).await?;
    tracing::info!(user_id = user.id, role = ?user.role, "User created");

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "users",
    summary = "Update user",
    params(("id" = i32, Path, description = "User ID")),
    request_body = UserUpdate,
    responses(
        (status = 200, description = "Account updated", body = UserResponse),
        (status = 400, description = "Invalid fields, or nothing to update"),
        (status = 403, description = "Requires admin role"),
        (status = 404, description = "User not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = id))]
pub async fn update_user(
    State(state): State<AppState>,
    PathParam(id): PathParam<UserId>,
    _: AdminUser,
    JsonBody(body): JsonBody<UserUpdate>,
) -> Result<Json<UserResponse>> {
    let rules = &state.config.auth.password;
    let mut v = Validator::new();
    let email = v.parse_optional("email", body.email.as_deref(), |e| is_valid_email(e).then(|| e.to_string()), "Valid email is required");
    v.max_chars("email", body.email.as_deref(), TEXT_MAX, "Email");
    let role = v.parse_optional("role", body.role.as_deref(), parse_enum::<Role>, "Role must be admin or teacher");
    if let Some(password) = body.password.as_deref() {
        check_password(&mut v, password, rules);
    }
    v.finish()?;

    let password_hash = match body.password {
        Some(password) => Some(hash_password(password, Argon2Params::from(rules)).await?),
        None => None,
    };
    let request = UserUpdateDBRequest { email, role, password_hash };
    if request.is_empty() {
        return Err(Error::BadRequest {
            message: "No valid fields to update".to_string(),
        });
    }

    let mut conn = state.db.acquire().await?;
    let user = conn.users().update(id, &request).await.map_err(not_found_as("User", id))?;

    Ok(Json(UserResponse::from(user)))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "users",
    summary = "Delete user",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "Account deleted", body = MessageResponse),
        (status = 400, description = "Cannot delete your own account"),
        (status = 403, description = "Requires admin role"),
        (status = 404, description = "User not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = id))]
pub async fn delete_user(
    State(state): State<AppState>,
    PathParam(id): PathParam<UserId>,
    RequiresRole(current_user, _): AdminUser,
) -> Result<Json<MessageResponse>> {
    if current_user.id == id {
        return Err(Error::BadRequest {
            message: "Cannot delete your own account".to_string(),
        });
    }

    let mut conn = state.db.acquire().await?;
    if !conn.users().delete(id).await? {
        return Err(user_not_found(id));
    }
    tracing::info!(deleted_by = current_user.id, "User deleted");

    Ok(Json(MessageResponse::new("User deleted successfully")))
}
