//! Response DTOs
//!
//! Data structures for API response bodies. The nested coworking/place view
//! is assembled here, at the outermost boundary, from flat domain rows.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::application::services::token_authority::Tokens;
use crate::domain::entities::{
    Booking, Coworking, CoworkingLayout, LayoutVersion, Place, Session, User,
};

/// Token pair response (OAuth-style field names)
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub token_type: String,
}

impl From<Tokens> for TokenResponse {
    fn from(tokens: Tokens) -> Self {
        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_in: tokens.expires_in,
            token_type: tokens.token_type,
        }
    }
}

/// User profile response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub roles: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            roles: user.roles.iter().map(|r| r.to_string()).collect(),
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

/// Session listing entry
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub id: Uuid,
    pub user_agent: String,
    pub ip_address: String,
    pub device_name: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        Self {
            id: session.id,
            user_agent: session.user_agent,
            ip_address: session.ip_address,
            device_name: session.device_name,
            expires_at: session.expires_at,
            last_used_at: session.last_used_at,
            revoked: session.revoked,
            created_at: session.created_at,
        }
    }
}

/// Booking response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub place_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl From<Booking> for BookingResponse {
    fn from(booking: Booking) -> Self {
        Self {
            id: booking.id,
            user_id: booking.user_id,
            place_id: booking.place_id,
            start_time: booking.start_time,
            end_time: booking.end_time,
            status: booking.status.to_string(),
            cancel_reason: booking.cancel_reason,
            created_at: booking.created_at,
            updated_at: booking.updated_at,
            cancelled_at: booking.cancelled_at,
        }
    }
}

/// Coworking response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoworkingResponse {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Coworking> for CoworkingResponse {
    fn from(coworking: Coworking) -> Self {
        Self {
            id: coworking.id,
            name: coworking.name,
            address: coworking.address,
            is_active: coworking.is_active,
            created_at: coworking.created_at,
            updated_at: coworking.updated_at,
        }
    }
}

/// Place response (flat, no nested coworking)
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceResponse {
    pub id: Uuid,
    pub coworking_id: Uuid,
    pub label: String,
    pub place_type: String,
    pub is_active: bool,
}

impl From<Place> for PlaceResponse {
    fn from(place: Place) -> Self {
        Self {
            id: place.id,
            coworking_id: place.coworking_id,
            label: place.label,
            place_type: place.place_type,
            is_active: place.is_active,
        }
    }
}

/// Nested coworking-with-places view, assembled at the API boundary from
/// flat rows.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoworkingPlacesResponse {
    pub coworking: CoworkingResponse,
    pub places: Vec<PlaceResponse>,
}

impl CoworkingPlacesResponse {
    pub fn assemble(coworking: Coworking, places: Vec<Place>) -> Self {
        Self {
            coworking: coworking.into(),
            places: places.into_iter().map(PlaceResponse::from).collect(),
        }
    }
}

/// Layout response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutResponse {
    pub coworking_id: Uuid,
    pub version: i32,
    pub layout: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl From<CoworkingLayout> for LayoutResponse {
    fn from(layout: CoworkingLayout) -> Self {
        Self {
            coworking_id: layout.coworking_id,
            version: layout.version,
            layout: layout.layout,
            created_at: layout.created_at,
        }
    }
}

/// Layout version listing entry
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutVersionResponse {
    pub version: i32,
    pub created_at: DateTime<Utc>,
}

impl From<LayoutVersion> for LayoutVersionResponse {
    fn from(version: LayoutVersion) -> Self {
        Self {
            version: version.version,
            created_at: version.created_at,
        }
    }
}

/// Newly created layout version
#[derive(Debug, Serialize)]
pub struct LayoutCreatedResponse {
    pub version: i32,
}
