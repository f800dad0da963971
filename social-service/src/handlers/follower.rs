use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::{
        follower::{FollowRequest, FollowResponse},
        ListResponse,
    },
    middleware::Caller,
    models::{FollowerColumn, SanitizedUser},
    query::{Direction, Filter, ListParams, ListQuery},
    AppState,
};

/// Follow `following_id`, or unfollow it if already followed
#[utoipa::path(
    post,
    path = "/v1/follower",
    request_body = FollowRequest,
    responses(
        (status = 200, description = "Follow state toggled", body = FollowResponse),
        (status = 400, description = "Cannot follow yourself", body = ErrorResponse),
        (status = 409, description = "Unknown account or concurrent toggles", body = ErrorResponse)
    ),
    tag = "Follower",
    security(("bearer_auth" = []))
)]
pub async fn toggle_follow(
    State(state): State<AppState>,
    caller: Caller,
    Json(req): Json<FollowRequest>,
) -> Result<impl IntoResponse, AppError> {
    let follower_id = caller.scope(req.follower_id.unwrap_or_else(|| caller.id()));
    let outcome = state.follow.toggle(follower_id, req.following_id).await?;
    Ok(Json(FollowResponse::new(
        follower_id,
        req.following_id,
        outcome,
    )))
}

/// Accounts following `following_id`, most recent follow first.
///
/// Regular accounts always list their own followers.
#[utoipa::path(
    get,
    path = "/v1/follower/list",
    params(ListParams),
    responses(
        (status = 200, description = "One page of followers", body = UserList),
        (status = 400, description = "following_id missing or malformed", body = ErrorResponse)
    ),
    tag = "Follower",
    security(("bearer_auth" = []))
)]
pub async fn list_followers(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let following = if caller.is_user() {
        Filter::eq(FollowerColumn::FollowingId, caller.id())?
    } else {
        let raw = params
            .following_id()
            .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("following_id is required")))?;
        Filter::parse(FollowerColumn::FollowingId, "eq", raw)?
    };

    let mut query = ListQuery::new().filter(following);
    if let Some(term) = params.search() {
        for column in [
            FollowerColumn::FullName,
            FollowerColumn::Username,
            FollowerColumn::Email,
        ] {
            query = query.filter(Filter::search(column, term)?);
        }
    }
    let query = query
        .order_by(FollowerColumn::FollowedAt, Direction::Desc)
        .order_by(FollowerColumn::FollowerId, Direction::Desc)
        .paginate(params.page(), params.limit())
        .compile();

    let (users, count) = state.repos.followers.list_followers(&query).await?;
    let items: Vec<SanitizedUser> = users.into_iter().map(SanitizedUser::from).collect();
    Ok(Json(ListResponse::new(items, count)))
}
