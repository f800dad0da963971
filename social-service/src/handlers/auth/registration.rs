use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use service_core::error::AppError;

use crate::{
    dtos::auth::{AuthResponse, RegisterRequest, RegisterResponse, VerifyEmailRequest},
    services::{ClientInfo, Registration},
    utils::{Password, ValidatedJson},
    AppState,
};

/// Register a new account and mail it a verification code
#[utoipa::path(
    post,
    path = "/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered, verification code sent", body = RegisterResponse),
        (status = 400, description = "Invalid request body", body = ErrorResponse),
        (status = 409, description = "User already exists", body = ErrorResponse),
        (status = 429, description = "Too many registrations from this IP", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .auth
        .register(Registration {
            full_name: req.full_name,
            username: req.username,
            email: req.email,
            password: Password::new(req.password),
            gender: req.gender,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id: user.id.to_string(),
            message: "User registered successfully, please verify your email address".to_string(),
        }),
    ))
}

/// Confirm the emailed code, activate the account and open a session
#[utoipa::path(
    post,
    path = "/v1/auth/verify-email",
    request_body = VerifyEmailRequest,
    responses(
        (status = 200, description = "Email verified, session opened", body = AuthResponse),
        (status = 400, description = "Incorrect otp", body = ErrorResponse),
        (status = 404, description = "Unknown email", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn verify_email(
    State(state): State<AppState>,
    client: ClientInfo,
    ValidatedJson(req): ValidatedJson<VerifyEmailRequest>,
) -> Result<impl IntoResponse, AppError> {
    let signed_in = state
        .auth
        .verify_email(&req.email, &req.otp, &req.platform, client)
        .await?;
    Ok(Json(AuthResponse::from(signed_in)))
}
