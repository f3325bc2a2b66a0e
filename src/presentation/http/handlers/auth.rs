//! Authentication Handlers

use axum::{extract::State, http::StatusCode, Json};
use validator::Validate;

use crate::application::dto::request::{LoginRequest, RefreshTokenRequest, RegisterRequest};
use crate::application::dto::response::TokenResponse;
use crate::presentation::http::extractors::ClientDevice;
use crate::shared::error::AppError;
use crate::shared::validation::validation_error;
use crate::startup::AppState;

use super::{map_session_error, session_service};

/// Register a new user
pub async fn register(
    State(state): State<AppState>,
    ClientDevice(device): ClientDevice,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), AppError> {
    body.validate().map_err(validation_error)?;

    let tokens = session_service(&state)
        .register(&body.email, &body.password, &body.role_code, device)
        .await
        .map_err(map_session_error)?;

    Ok((StatusCode::CREATED, Json(tokens.into())))
}

/// Login with credentials
pub async fn login(
    State(state): State<AppState>,
    ClientDevice(device): ClientDevice,
    Json(body): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    body.validate().map_err(validation_error)?;

    let tokens = session_service(&state)
        .login(&body.email, &body.password, device)
        .await
        .map_err(map_session_error)?;

    Ok(Json(tokens.into()))
}

/// Exchange a refresh token for a new pair (rotation)
pub async fn refresh(
    State(state): State<AppState>,
    ClientDevice(device): ClientDevice,
    Json(body): Json<RefreshTokenRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let tokens = session_service(&state)
        .refresh(&body.refresh_token, device)
        .await
        .map_err(map_session_error)?;

    Ok(Json(tokens.into()))
}

/// Logout (revoke the refresh token's session)
pub async fn logout(
    State(state): State<AppState>,
    Json(body): Json<RefreshTokenRequest>,
) -> Result<StatusCode, AppError> {
    session_service(&state)
        .logout(&body.refresh_token)
        .await
        .map_err(map_session_error)?;

    Ok(StatusCode::NO_CONTENT)
}
