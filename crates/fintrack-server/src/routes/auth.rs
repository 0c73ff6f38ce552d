//! `/api/auth` handlers.
//!
//! Request bodies are JSON except for the two password-reset link
//! endpoints, which take a bare string body.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use fintrack_auth::error::{AuthError, AuthenticationError};
use fintrack_auth::service::{LoginOutput, OtpPasswordResetInput, SignupInput};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

const GENERIC_RESET_REPLY: &str =
    "If an account with this email exists, we've sent password reset instructions.";

#[derive(Debug, Deserialize)]
pub(super) struct SignupRequest {
    name: String,
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct EmailRequest {
    email: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct OtpRequest {
    email: String,
    otp: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct OtpResetRequest {
    email: String,
    otp: String,
    new_password: String,
    confirm_password: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct TokenQuery {
    token: String,
}

#[derive(Debug, Serialize)]
pub(super) struct AuthResponse {
    token: String,
    roles: Vec<String>,
    verified: bool,
}

impl From<LoginOutput> for AuthResponse {
    fn from(out: LoginOutput) -> Self {
        Self {
            token: out.token,
            roles: out.roles,
            verified: out.verified,
        }
    }
}

/// Accepts `ann@x.com` as well as the JSON string `"ann@x.com"`.
fn bare_string(body: &str) -> &str {
    body.trim().trim_matches('"')
}

/// Swallow "no such account" so the reply does not reveal which
/// addresses are registered.
fn generic_reply(result: Result<(), AuthError>) -> Result<&'static str, ApiError> {
    match result {
        Ok(()) | Err(AuthError::Authentication(AuthenticationError::AccountNotFound)) => {
            Ok(GENERIC_RESET_REPLY)
        }
        Err(e) => Err(e.into()),
    }
}

pub(super) async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<&'static str, ApiError> {
    state
        .service
        .signup(SignupInput {
            name: req.name,
            email: req.email,
            password: req.password,
        })
        .await?;
    Ok("User registered successfully. Please check your email to verify.")
}

pub(super) async fn verify_email(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> Result<&'static str, ApiError> {
    match state.service.verify_email(&query.token).await {
        Ok(_) => Ok("Email verified successfully. You can now log in."),
        Err(e) if e.is_client_error() => Err(ApiError::BadRequest(
            "Invalid or expired verification token.".into(),
        )),
        Err(e) => Err(e.into()),
    }
}

pub(super) async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let out = state.service.login(&req.email, &req.password).await?;
    Ok(Json(out.into()))
}

pub(super) async fn send_otp(
    State(state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> Result<&'static str, ApiError> {
    state.service.send_otp(&req.email).await?;
    Ok("OTP sent to email")
}

pub(super) async fn verify_otp(
    State(state): State<AppState>,
    Json(req): Json<OtpRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let out = state.service.verify_otp(&req.email, &req.otp).await?;
    Ok(Json(out.into()))
}

pub(super) async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<&'static str, ApiError> {
    let authorization = headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok());
    match state.service.logout(authorization).await {
        Ok(()) => Ok("Logged out successfully"),
        Err(AuthError::Token(_)) => Err(ApiError::BadRequest("Invalid or missing token".into())),
        Err(e) => Err(e.into()),
    }
}

pub(super) async fn password_reset_request(
    State(state): State<AppState>,
    body: String,
) -> Result<&'static str, ApiError> {
    generic_reply(state.service.request_password_reset(bare_string(&body)).await)
}

pub(super) async fn password_reset(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
    body: String,
) -> Result<&'static str, ApiError> {
    state
        .service
        .confirm_password_reset(&query.token, bare_string(&body))
        .await?;
    Ok("Password reset successfully")
}

pub(super) async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> Result<&'static str, ApiError> {
    generic_reply(state.service.forgot_password(&req.email).await)
}

pub(super) async fn reset_password_with_otp(
    State(state): State<AppState>,
    Json(req): Json<OtpResetRequest>,
) -> Result<&'static str, ApiError> {
    state
        .service
        .reset_password_with_otp(OtpPasswordResetInput {
            email: req.email,
            otp: req.otp,
            new_password: req.new_password,
            confirm_password: req.confirm_password,
        })
        .await?;
    Ok("Password reset successful")
}
