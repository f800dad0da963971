use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 255, message = "Full name is required"))]
    #[schema(example = "Jane Doe")]
    pub full_name: String,

    #[validate(length(min = 3, max = 64, message = "Username must be 3-64 characters"))]
    #[schema(example = "jane")]
    pub username: String,

    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "jane@example.com")]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    #[schema(example = "password123", min_length = 8)]
    pub password: String,

    /// `user` (default) or `admin`
    #[schema(example = "user")]
    pub user_type: Option<String>,

    #[schema(example = "user")]
    pub user_role: Option<String>,

    /// Defaults to `active`; accounts created here skip email verification.
    #[schema(example = "active")]
    pub status: Option<String>,

    pub avatar_id: Option<String>,

    #[schema(example = "female")]
    pub gender: Option<String>,
}

/// Fields left out keep their current value. `user_type`, `user_role` and
/// `status` are only honoured for administrators.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    pub id: Uuid,

    #[validate(length(min = 1, max = 255))]
    pub full_name: Option<String>,

    #[validate(length(min = 3, max = 64))]
    pub username: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    /// Re-hashed when non-empty.
    pub password: Option<String>,

    pub avatar_id: Option<String>,
    pub gender: Option<String>,
    pub user_type: Option<String>,
    pub user_role: Option<String>,
    pub status: Option<String>,
}
