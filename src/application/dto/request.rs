//! Request DTOs
//!
//! Data structures for API request bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Registration request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[serde(rename = "roleCode")]
    pub role_code: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password must not be empty"))]
    pub password: String,
}

/// Refresh / logout request
#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Session revocation request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokeSessionRequest {
    pub session_id: Uuid,
}

/// Create booking request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub place_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Optional cancellation body for DELETE /bookings/{id}
#[derive(Debug, Default, Deserialize)]
pub struct CancelBookingRequest {
    pub reason: Option<String>,
}

/// Query string of GET /coworkings/{id}/available-places
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailablePlacesQuery {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Create coworking request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCoworkingRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    #[validate(length(min = 1, message = "Address must not be empty"))]
    pub address: String,
}

/// Update coworking request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCoworkingRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    #[validate(length(min = 1, message = "Address must not be empty"))]
    pub address: String,
}

/// One place in a batch-creation request
#[derive(Debug, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PlaceInput {
    #[validate(length(min = 1, max = 64, message = "Label must be 1-64 characters"))]
    pub label: String,

    #[validate(length(min = 1, max = 32, message = "Place type must be 1-32 characters"))]
    pub place_type: String,
}

/// Batch place creation request
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePlacesRequest {
    #[validate(length(min = 1, message = "At least one place is required"))]
    #[validate(nested)]
    pub places: Vec<PlaceInput>,
}

/// Place activation request
#[derive(Debug, Deserialize)]
pub struct SetPlaceActiveRequest {
    pub active: bool,
}
