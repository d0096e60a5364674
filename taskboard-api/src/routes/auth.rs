/// Authentication endpoints
///
/// This module provides user authentication endpoints:
/// - Registration
/// - Login
/// - Token refresh
///
/// # Endpoints
///
/// - `POST /v1/auth/registration` - Register new user
/// - `POST /v1/auth/login` - Login and get tokens
/// - `POST /v1/auth/refresh` - Refresh access token

use crate::{app::AppState, error::ApiResult};
use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use taskboard_shared::models::user::User;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

/// Registration request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Display name
    #[serde(default)]
    #[validate(length(min = 1, max = 150, message = "Full name must be 1-150 characters"))]
    pub fullname: String,

    /// Email address (login handle)
    #[serde(default)]
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    /// Must equal `password`
    #[serde(default)]
    pub repeated_password: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Registration and login response
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Access token (24h)
    pub token: String,

    /// Refresh token (30d)
    pub refresh_token: String,

    pub fullname: String,
    pub email: String,
    pub user_id: Uuid,
}

/// Refresh token request
#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

/// Refresh token response
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    /// New access token (24h)
    pub token: String,
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/registration
/// Content-Type: application/json
///
/// {
///   "fullname": "Ada Lovelace",
///   "email": "ada@example.com",
///   "password": "analytical",
///   "repeated_password": "analytical"
/// }
/// ```
///
/// # Response
///
/// `201 Created` with an [`AuthResponse`].
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed (including an email already in use)
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let Json(req) = payload?;
    req.validate()?;

    let user = state
        .identity
        .register(&req.email, &req.fullname, &req.password, &req.repeated_password)
        .await?;

    Ok((StatusCode::CREATED, Json(auth_response(&state, &user)?)))
}

/// Login endpoint
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/login
/// Content-Type: application/json
///
/// {
///   "email": "ada@example.com",
///   "password": "analytical"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Missing fields
/// - `401 Unauthorized`: Invalid credentials
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<AuthResponse>> {
    let Json(req) = payload?;
    req.validate()?;

    let user = state.identity.authenticate(&req.email, &req.password).await?;
    info!(user_id = %user.id, "User logged in");

    Ok(Json(auth_response(&state, &user)?))
}

/// Token refresh endpoint
///
/// Exchanges a refresh token for a new access token.
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid or expired refresh token
pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> ApiResult<Json<RefreshResponse>> {
    let Json(req) = payload?;
    req.validate()?;

    let token = state.identity.refresh(&req.refresh_token)?;

    Ok(Json(RefreshResponse { token }))
}

fn auth_response(state: &AppState, user: &User) -> ApiResult<AuthResponse> {
    let tokens = state.identity.issue_tokens(user)?;

    Ok(AuthResponse {
        token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        fullname: user.display_name.clone(),
        email: user.email.clone(),
        user_id: user.id,
    })
}
