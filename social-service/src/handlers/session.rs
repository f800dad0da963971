use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use super::newest_first;
use crate::{
    dtos::{session::UpdateSessionRequest, ListResponse, MessageResponse},
    middleware::Caller,
    models::{Session, SessionColumn},
    query::{Filter, ListParams},
    services::SessionUpdate,
    utils::ValidatedJson,
    AppState,
};

/// Load a session the caller may see. Regular accounts only see their own.
async fn owned_session(state: &AppState, caller: &Caller, id: Uuid) -> Result<Session, AppError> {
    let session = state.repos.sessions.get_session(id).await?;
    if caller.is_user() && session.user_id != caller.id() {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "You have no access to the session"
        )));
    }
    Ok(session)
}

#[utoipa::path(
    get,
    path = "/v1/session/{id}",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session found", body = Session),
        (status = 403, description = "Session belongs to someone else", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    tag = "Session",
    security(("bearer_auth" = []))
)]
pub async fn get_session(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(owned_session(&state, &caller, id).await?))
}

/// Page through sessions. `user_id` is forced to the caller for regular
/// accounts.
#[utoipa::path(
    get,
    path = "/v1/session/list",
    params(ListParams),
    responses(
        (status = 200, description = "One page of sessions", body = SessionList),
        (status = 400, description = "Malformed user_id", body = ErrorResponse)
    ),
    tag = "Session",
    security(("bearer_auth" = []))
)]
pub async fn list_sessions(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let mut query = newest_first(
        &params,
        &[SessionColumn::Platform],
        SessionColumn::CreatedAt,
        SessionColumn::Id,
    )?;

    if caller.is_user() {
        query = query.filter(Filter::eq(SessionColumn::UserId, caller.id())?);
    } else if let Some(user_id) = params.user_id() {
        query = query.filter(Filter::parse(SessionColumn::UserId, "eq", user_id)?);
    }

    let (items, count) = state.repos.sessions.list_sessions(&query.compile()).await?;
    Ok(Json(ListResponse::new(items, count)))
}

/// Refresh a session's client IP and active flag
#[utoipa::path(
    put,
    path = "/v1/session",
    request_body = UpdateSessionRequest,
    responses(
        (status = 200, description = "Session updated", body = Session),
        (status = 403, description = "Session belongs to someone else", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    tag = "Session",
    security(("bearer_auth" = []))
)]
pub async fn update_session(
    State(state): State<AppState>,
    caller: Caller,
    ValidatedJson(req): ValidatedJson<UpdateSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    owned_session(&state, &caller, req.id).await?;

    let session = state
        .repos
        .sessions
        .update_session(SessionUpdate {
            id: req.id,
            ip_address: req.ip_address,
            is_active: req.is_active,
        })
        .await?;

    tracing::info!(session_id = %session.id, is_active = session.is_active, "Session updated");
    Ok(Json(session))
}

/// Revoke a session. Every credential naming it stops working.
#[utoipa::path(
    delete,
    path = "/v1/session/{id}",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session deleted", body = MessageResponse),
        (status = 403, description = "Session belongs to someone else", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    tag = "Session",
    security(("bearer_auth" = []))
)]
pub async fn delete_session(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    owned_session(&state, &caller, id).await?;
    state.repos.sessions.delete_session(id).await?;
    tracing::info!(session_id = %id, deleted_by = %caller.id(), "Session deleted");
    Ok(Json(MessageResponse::new("Session deleted successfully")))
}
