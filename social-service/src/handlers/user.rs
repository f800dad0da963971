use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use service_core::error::AppError;
use uuid::Uuid;

use super::newest_first;
use crate::{
    dtos::{
        user::{CreateUserRequest, UpdateUserRequest},
        ListResponse, MessageResponse,
    },
    middleware::Caller,
    models::{user_status, user_type, SanitizedUser, User, UserColumn},
    query::ListParams,
    services::UserLookup,
    utils::{hash_password, Password, ValidatedJson},
    AppState,
};

/// Create an account directly (no email verification)
#[utoipa::path(
    post,
    path = "/v1/user",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = SanitizedUser),
        (status = 400, description = "Invalid request body", body = ErrorResponse),
        (status = 403, description = "Permission denied", body = ErrorResponse),
        (status = 409, description = "Username or email taken", body = ErrorResponse)
    ),
    tag = "User",
    security(("bearer_auth" = []))
)]
pub async fn create_user(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let password = hash_password(&Password::new(req.password)).map_err(|e| {
        tracing::error!(error = %e, "Password hashing failed");
        AppError::BadRequest(anyhow::anyhow!("Error hashing password"))
    })?;

    let kind = req.user_type.unwrap_or_else(|| user_type::USER.to_string());
    let now = Utc::now();
    let user = state
        .repos
        .users
        .create_user(User {
            id: Uuid::new_v4(),
            full_name: req.full_name,
            username: req.username,
            email: req.email,
            password,
            user_role: req.user_role.unwrap_or_else(|| kind.clone()),
            user_type: kind,
            status: req
                .status
                .unwrap_or_else(|| user_status::ACTIVE.to_string()),
            avatar_id: req.avatar_id,
            gender: req.gender,
            created_at: now,
            updated_at: now,
        })
        .await?;

    tracing::info!(user_id = %user.id, user_type = %user.user_type, "User created");
    Ok((StatusCode::CREATED, Json(user.sanitized())))
}

#[utoipa::path(
    get,
    path = "/v1/user/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User found", body = SanitizedUser),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    tag = "User",
    security(("bearer_auth" = []))
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.repos.users.find_user(UserLookup::Id(id)).await?;
    Ok(Json(user.sanitized()))
}

/// Page through accounts, newest first
#[utoipa::path(
    get,
    path = "/v1/user/list",
    params(ListParams),
    responses(
        (status = 200, description = "One page of users", body = UserList)
    ),
    tag = "User",
    security(("bearer_auth" = []))
)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let query = newest_first(
        &params,
        &[UserColumn::FullName, UserColumn::Username, UserColumn::Email],
        UserColumn::CreatedAt,
        UserColumn::Id,
    )?
    .compile();

    let (users, count) = state.repos.users.list_users(&query).await?;
    let items: Vec<SanitizedUser> = users.into_iter().map(SanitizedUser::from).collect();
    Ok(Json(ListResponse::new(items, count)))
}

/// Update an account. Regular accounts always update themselves.
#[utoipa::path(
    put,
    path = "/v1/user",
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = SanitizedUser),
        (status = 400, description = "Invalid request body", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 409, description = "Username or email taken", body = ErrorResponse)
    ),
    tag = "User",
    security(("bearer_auth" = []))
)]
pub async fn update_user(
    State(state): State<AppState>,
    caller: Caller,
    ValidatedJson(req): ValidatedJson<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let id = caller.scope(req.id);
    let mut user = state.repos.users.find_user(UserLookup::Id(id)).await?;

    if let Some(full_name) = req.full_name {
        user.full_name = full_name;
    }
    if let Some(username) = req.username {
        user.username = username;
    }
    if let Some(email) = req.email {
        user.email = email;
    }
    if let Some(avatar_id) = req.avatar_id {
        user.avatar_id = Some(avatar_id);
    }
    if let Some(gender) = req.gender {
        user.gender = Some(gender);
    }
    if let Some(password) = req.password.filter(|p| !p.is_empty()) {
        user.password = hash_password(&Password::new(password)).map_err(|e| {
            tracing::error!(error = %e, "Password hashing failed");
            AppError::BadRequest(anyhow::anyhow!("Error hashing password"))
        })?;
    }

    if !caller.is_user() {
        if let Some(kind) = req.user_type {
            user.user_type = kind;
        }
        if let Some(role) = req.user_role {
            user.user_role = role;
        }
        if let Some(status) = req.status {
            user.status = status;
        }
    }

    let user = state.repos.users.update_user(user).await?;
    tracing::info!(user_id = %user.id, updated_by = %caller.id(), "User updated");
    Ok(Json(user.sanitized()))
}

/// Delete an account. Regular accounts always delete themselves.
#[utoipa::path(
    delete,
    path = "/v1/user/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    tag = "User",
    security(("bearer_auth" = []))
)]
pub async fn delete_user(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let id = caller.scope(id);
    state.repos.users.delete_user(id).await?;
    tracing::info!(user_id = %id, deleted_by = %caller.id(), "User deleted");
    Ok(Json(MessageResponse::new("User deleted successfully")))
}
