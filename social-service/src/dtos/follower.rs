use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::services::FollowOutcome;

#[derive(Debug, Deserialize, ToSchema)]
pub struct FollowRequest {
    /// Account to follow or unfollow.
    pub following_id: Uuid,

    /// Ignored for regular accounts, which always act as themselves.
    pub follower_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FollowResponse {
    pub follower_id: Uuid,
    pub following_id: Uuid,
    /// `created` or `unfollowed`
    #[schema(example = "created")]
    pub outcome: String,
    /// Whether the follower follows `following_id` after the toggle.
    pub followed: bool,
}

impl FollowResponse {
    pub fn new(follower_id: Uuid, following_id: Uuid, outcome: FollowOutcome) -> Self {
        Self {
            follower_id,
            following_id,
            outcome: outcome.as_str().to_string(),
            followed: outcome == FollowOutcome::Created,
        }
    }
}
