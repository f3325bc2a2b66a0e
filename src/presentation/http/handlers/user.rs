//! User & Session Handlers

use axum::{extract::State, http::StatusCode, Json};

use crate::application::dto::request::RevokeSessionRequest;
use crate::application::dto::response::{SessionResponse, UserResponse};
use crate::domain::entities::RoleCode;
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

use super::{map_session_error, session_service};

/// Current user's profile
pub async fn me(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<UserResponse>, AppError> {
    let profile = session_service(&state)
        .get_user(user.user_id)
        .await
        .map_err(map_session_error)?;

    Ok(Json(profile.into()))
}

/// Current user's active sessions
pub async fn active_sessions(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<SessionResponse>>, AppError> {
    list_sessions(state, user, true).await
}

/// All of the current user's sessions, including revoked and expired
pub async fn all_sessions(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<SessionResponse>>, AppError> {
    list_sessions(state, user, false).await
}

async fn list_sessions(
    state: AppState,
    user: AuthUser,
    only_active: bool,
) -> Result<Json<Vec<SessionResponse>>, AppError> {
    let sessions = session_service(&state)
        .get_user_sessions(user.user_id, only_active)
        .await
        .map_err(map_session_error)?;

    Ok(Json(sessions.into_iter().map(SessionResponse::from).collect()))
}

/// Revoke one session. Admins may revoke any session; other users only
/// their own.
pub async fn revoke_session(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<RevokeSessionRequest>,
) -> Result<StatusCode, AppError> {
    let service = session_service(&state);

    if !state.authorizer.check(&user.roles, &[RoleCode::Admin]) {
        let owned = service
            .get_user_sessions(user.user_id, false)
            .await
            .map_err(map_session_error)?;
        if !owned.iter().any(|s| s.id == body.session_id) {
            return Err(AppError::Forbidden("Not your session".into()));
        }
    }

    service
        .revoke_session(body.session_id)
        .await
        .map_err(map_session_error)?;

    Ok(StatusCode::ACCEPTED)
}
