use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use super::newest_first;
use crate::{
    dtos::{
        tag::{CreateTagRequest, UpdateTagRequest},
        ListResponse, MessageResponse,
    },
    models::{Tag, TagColumn},
    query::ListParams,
    utils::ValidatedJson,
    AppState,
};

#[utoipa::path(
    post,
    path = "/v1/tag",
    request_body = CreateTagRequest,
    responses(
        (status = 201, description = "Tag created", body = Tag),
        (status = 409, description = "Slug already exists", body = ErrorResponse)
    ),
    tag = "Tag",
    security(("bearer_auth" = []))
)]
pub async fn create_tag(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateTagRequest>,
) -> Result<impl IntoResponse, AppError> {
    let tag = state.repos.tags.create_tag(req.slug, req.level).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

#[utoipa::path(
    get,
    path = "/v1/tag/{id}",
    params(("id" = Uuid, Path, description = "Tag ID")),
    responses(
        (status = 200, description = "Tag found", body = Tag),
        (status = 404, description = "Tag not found", body = ErrorResponse)
    ),
    tag = "Tag",
    security(("bearer_auth" = []))
)]
pub async fn get_tag(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.repos.tags.get_tag(id).await?))
}

#[utoipa::path(
    get,
    path = "/v1/tag/list",
    params(ListParams),
    responses(
        (status = 200, description = "One page of tags", body = TagList)
    ),
    tag = "Tag",
    security(("bearer_auth" = []))
)]
pub async fn list_tags(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let query = newest_first(&params, &[TagColumn::Slug], TagColumn::CreatedAt, TagColumn::Id)?
        .compile();
    let (items, count) = state.repos.tags.list_tags(&query).await?;
    Ok(Json(ListResponse::new(items, count)))
}

#[utoipa::path(
    put,
    path = "/v1/tag",
    request_body = UpdateTagRequest,
    responses(
        (status = 200, description = "Tag updated", body = Tag),
        (status = 404, description = "Tag not found", body = ErrorResponse),
        (status = 409, description = "Slug already exists", body = ErrorResponse)
    ),
    tag = "Tag",
    security(("bearer_auth" = []))
)]
pub async fn update_tag(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<UpdateTagRequest>,
) -> Result<impl IntoResponse, AppError> {
    let tag = state
        .repos
        .tags
        .update_tag(req.id, req.slug, req.level)
        .await?;
    Ok(Json(tag))
}

#[utoipa::path(
    delete,
    path = "/v1/tag/{id}",
    params(("id" = Uuid, Path, description = "Tag ID")),
    responses(
        (status = 200, description = "Tag deleted", body = MessageResponse),
        (status = 404, description = "Tag not found", body = ErrorResponse)
    ),
    tag = "Tag",
    security(("bearer_auth" = []))
)]
pub async fn delete_tag(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.repos.tags.delete_tag(id).await?;
    Ok(Json(MessageResponse::new("Tag deleted successfully")))
}
