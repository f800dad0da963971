use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateTagRequest {
    #[validate(length(min = 1, max = 255, message = "Slug is required"))]
    #[schema(example = "rust")]
    pub slug: String,

    #[serde(default)]
    #[schema(example = 1)]
    pub level: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateTagRequest {
    pub id: Uuid,

    #[validate(length(min = 1, max = 255, message = "Slug is required"))]
    #[schema(example = "rust")]
    pub slug: String,

    #[serde(default)]
    #[schema(example = 2)]
    pub level: i32,
}
