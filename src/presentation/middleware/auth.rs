//! Authentication Middleware
//!
//! Bearer-JWT validation for protected routes, plus the role gate for admin
//! routes. The role decision itself is delegated to the [`Authorizer`] seam
//! carried in application state.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use uuid::Uuid;

use crate::domain::entities::RoleCode;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Authenticated user extension
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub roles: Vec<RoleCode>,
}

/// Authentication middleware that validates bearer JWTs
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let TypedHeader(Authorization(bearer)) = bearer
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".into()))?;

    let claims = state
        .token_authority
        .verify_access(bearer.token())
        .map_err(|e| match e {
            crate::application::services::TokenError::Expired => {
                AppError::Unauthorized("Token expired".into())
            }
            _ => AppError::Unauthorized("Invalid token".into()),
        })?;

    let roles = claims
        .roles
        .iter()
        .filter_map(|r| RoleCode::parse(r))
        .collect();

    request.extensions_mut().insert(AuthUser {
        user_id: claims.sub,
        email: claims.email,
        roles,
    });

    Ok(next.run(request).await)
}

/// Role gate for admin routes; must run after `auth_middleware`.
pub async fn admin_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| AppError::Unauthorized("Missing authentication".into()))?;

    if !state.authorizer.check(&user.roles, &[RoleCode::Admin]) {
        return Err(AppError::Forbidden("Admin role required".into()));
    }

    Ok(next.run(request).await)
}
