pub mod auth;
pub mod follower;
pub mod session;
pub mod tag;
pub mod tweet;
pub mod user;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{SanitizedUser, Session, Tag, TweetDetails};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    #[schema(example = "Permission denied for GET /v1/tag/list")]
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    #[schema(example = "Tweet deleted successfully")]
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// One page of a list endpoint. `count` is the total number of matches,
/// independent of paging.
#[derive(Debug, Serialize, ToSchema)]
#[aliases(
    UserList = ListResponse<SanitizedUser>,
    SessionList = ListResponse<Session>,
    TagList = ListResponse<Tag>,
    TweetList = ListResponse<TweetDetails>
)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    #[schema(example = 42)]
    pub count: i64,
}

impl<T> ListResponse<T> {
    pub fn new(items: Vec<T>, count: i64) -> Self {
        Self { items, count }
    }
}
