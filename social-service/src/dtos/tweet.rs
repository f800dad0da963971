use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::services::NewAttachment;

pub const DEFAULT_TWEET_STATUS: &str = "published";

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AttachmentRequest {
    #[validate(length(min = 1, message = "File path is required"))]
    #[schema(example = "uploads/2024/06/cat.png")]
    pub file_path: String,

    #[validate(length(min = 1, max = 128, message = "Content type is required"))]
    #[schema(example = "image/png")]
    pub content_type: String,
}

impl From<AttachmentRequest> for NewAttachment {
    fn from(req: AttachmentRequest) -> Self {
        Self {
            file_path: req.file_path,
            content_type: req.content_type,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateTweetRequest {
    #[validate(length(min = 1, message = "Content is required"))]
    #[schema(example = "hello, world")]
    pub content: String,

    #[validate(length(min = 1, max = 32))]
    #[schema(example = "published")]
    pub status: Option<String>,

    #[serde(default)]
    #[validate(nested)]
    pub attachments: Vec<AttachmentRequest>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateTweetRequest {
    pub id: Uuid,

    #[validate(length(min = 1, message = "Content is required"))]
    #[schema(example = "hello again")]
    pub content: String,

    #[validate(length(min = 1, max = 32))]
    #[schema(example = "published")]
    pub status: String,
}
