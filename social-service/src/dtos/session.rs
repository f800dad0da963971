use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateSessionRequest {
    pub id: Uuid,

    #[validate(length(max = 64))]
    #[schema(example = "203.0.113.7")]
    pub ip_address: String,

    #[schema(example = true)]
    pub is_active: bool,
}
