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
        tweet::{CreateTweetRequest, UpdateTweetRequest, DEFAULT_TWEET_STATUS},
        ListResponse, MessageResponse,
    },
    middleware::Caller,
    models::{Tweet, TweetColumn, TweetDetails},
    query::ListParams,
    services::NewAttachment,
    utils::ValidatedJson,
    AppState,
};

fn ensure_owner(caller: &Caller, tweet: &Tweet) -> Result<(), AppError> {
    if tweet.owner_id != caller.id() {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "You have no access to the tweet"
        )));
    }
    Ok(())
}

/// Post a tweet with its attachments
#[utoipa::path(
    post,
    path = "/v1/tweet",
    request_body = CreateTweetRequest,
    responses(
        (status = 201, description = "Tweet created", body = TweetDetails),
        (status = 400, description = "Invalid request body", body = ErrorResponse)
    ),
    tag = "Tweet",
    security(("bearer_auth" = []))
)]
pub async fn create_tweet(
    State(state): State<AppState>,
    caller: Caller,
    ValidatedJson(req): ValidatedJson<CreateTweetRequest>,
) -> Result<impl IntoResponse, AppError> {
    let now = Utc::now();
    let tweet = Tweet {
        id: Uuid::new_v4(),
        owner_id: caller.id(),
        content: req.content,
        status: req
            .status
            .unwrap_or_else(|| DEFAULT_TWEET_STATUS.to_string()),
        created_at: now,
        updated_at: now,
    };
    let attachments: Vec<NewAttachment> = req.attachments.into_iter().map(Into::into).collect();

    let (tweet, attachments) = state.repos.tweets.create_tweet(tweet, attachments).await?;
    tracing::info!(
        tweet_id = %tweet.id,
        owner_id = %tweet.owner_id,
        attachments = attachments.len(),
        "Tweet created"
    );

    let details = state.repos.tweets.get_tweet(tweet.id).await?;
    Ok((StatusCode::CREATED, Json(details)))
}

#[utoipa::path(
    get,
    path = "/v1/tweet/{id}",
    params(("id" = Uuid, Path, description = "Tweet ID")),
    responses(
        (status = 200, description = "Tweet with attachments and owner", body = TweetDetails),
        (status = 404, description = "Tweet not found", body = ErrorResponse)
    ),
    tag = "Tweet",
    security(("bearer_auth" = []))
)]
pub async fn get_tweet(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.repos.tweets.get_tweet(id).await?))
}

/// Page through tweets, newest first
#[utoipa::path(
    get,
    path = "/v1/tweet/list",
    params(ListParams),
    responses(
        (status = 200, description = "One page of tweets", body = TweetList)
    ),
    tag = "Tweet",
    security(("bearer_auth" = []))
)]
pub async fn list_tweets(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let query = newest_first(
        &params,
        &[TweetColumn::Content],
        TweetColumn::CreatedAt,
        TweetColumn::Id,
    )?
    .compile();
    let (items, count) = state.repos.tweets.list_tweets(&query).await?;
    Ok(Json(ListResponse::new(items, count)))
}

/// Edit one of the caller's tweets
#[utoipa::path(
    put,
    path = "/v1/tweet",
    request_body = UpdateTweetRequest,
    responses(
        (status = 200, description = "Tweet updated", body = Tweet),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Tweet not found", body = ErrorResponse)
    ),
    tag = "Tweet",
    security(("bearer_auth" = []))
)]
pub async fn update_tweet(
    State(state): State<AppState>,
    caller: Caller,
    ValidatedJson(req): ValidatedJson<UpdateTweetRequest>,
) -> Result<impl IntoResponse, AppError> {
    let current = state.repos.tweets.get_tweet(req.id).await?;
    ensure_owner(&caller, &current.tweet)?;

    let tweet = state
        .repos
        .tweets
        .update_tweet(req.id, req.content, req.status)
        .await?;
    Ok(Json(tweet))
}

/// Delete one of the caller's tweets
#[utoipa::path(
    delete,
    path = "/v1/tweet/{id}",
    params(("id" = Uuid, Path, description = "Tweet ID")),
    responses(
        (status = 200, description = "Tweet deleted", body = MessageResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Tweet not found", body = ErrorResponse)
    ),
    tag = "Tweet",
    security(("bearer_auth" = []))
)]
pub async fn delete_tweet(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let current = state.repos.tweets.get_tweet(id).await?;
    ensure_owner(&caller, &current.tweet)?;

    state.repos.tweets.delete_tweet(id).await?;
    tracing::info!(tweet_id = %id, "Tweet deleted");
    Ok(Json(MessageResponse::new("Tweet deleted successfully")))
}
