use axum::{extract::State, response::IntoResponse, Json};
use service_core::error::AppError;

use crate::{
    dtos::{
        auth::{AuthResponse, LoginRequest},
        MessageResponse,
    },
    middleware::Caller,
    services::{ClientInfo, LoginAttempt},
    utils::{Password, ValidatedJson},
    AppState,
};

/// Login with username or email
#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Incorrect password or wrong platform", body = ErrorResponse),
        (status = 404, description = "Unknown account", body = ErrorResponse),
        (status = 429, description = "Too many attempts from this IP", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn login(
    State(state): State<AppState>,
    client: ClientInfo,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let signed_in = state
        .auth
        .login(
            LoginAttempt {
                username: req.username,
                email: req.email,
                password: Password::new(req.password),
                platform: req.platform,
            },
            client,
        )
        .await?;
    Ok(Json(AuthResponse::from(signed_in)))
}

/// Close the caller's session
#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, description = "Missing or revoked credential", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<impl IntoResponse, AppError> {
    state.auth.logout(caller.0.session_id).await?;
    Ok(Json(MessageResponse::new("Successfully logged out")))
}
