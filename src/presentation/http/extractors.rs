//! Request Extractors

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::domain::entities::DeviceContext;
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Missing authentication".into()))
    }
}

/// Client device context captured from request headers, recorded on the
/// session a login/refresh mints.
#[derive(Debug, Clone)]
pub struct ClientDevice(pub DeviceContext);

#[async_trait]
impl<S> FromRequestParts<S> for ClientDevice
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };

        let user_agent = header("user-agent");
        let ip_address = {
            let forwarded = header("x-forwarded-for");
            forwarded
                .split(',')
                .next()
                .unwrap_or_default()
                .trim()
                .to_string()
        };
        let device_name = parts
            .headers
            .get("x-device-name")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Ok(ClientDevice(DeviceContext {
            user_agent,
            ip_address,
            device_name,
        }))
    }
}
