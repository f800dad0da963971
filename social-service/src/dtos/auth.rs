use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    models::{SanitizedUser, Session},
    services::SignedIn,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
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

    #[schema(example = "female")]
    pub gender: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterResponse {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub user_id: String,
    #[schema(example = "User registered successfully, please verify your email address")]
    pub message: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct VerifyEmailRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "jane@example.com")]
    pub email: String,

    #[validate(length(min = 1, message = "OTP is required"))]
    #[schema(example = "123456")]
    pub otp: String,

    #[validate(length(min = 1, message = "Platform is required"))]
    #[schema(example = "web")]
    pub platform: String,
}

/// Either `username` or `email` identifies the account.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "jane")]
    pub username: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "jane@example.com")]
    pub email: Option<String>,

    #[validate(length(min = 1, message = "Password is required"))]
    #[schema(example = "password123")]
    pub password: String,

    #[validate(length(min = 1, message = "Platform is required"))]
    #[schema(example = "web")]
    pub platform: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub user: SanitizedUser,
    pub session: Session,
    #[schema(example = "eyJhbGciOiJIUzI1NiJ9...")]
    pub access_token: String,
}

impl From<SignedIn> for AuthResponse {
    fn from(signed_in: SignedIn) -> Self {
        Self {
            user: signed_in.user,
            session: signed_in.session,
            access_token: signed_in.access_token,
        }
    }
}
