//! Administrative Handlers
//!
//! Coworking/place CRUD, activity flips, and layout management. All routes
//! here sit behind the admin role gate.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::application::dto::request::{
    CreateCoworkingRequest, CreatePlacesRequest, SetPlaceActiveRequest, UpdateCoworkingRequest,
};
use crate::application::dto::response::{CoworkingResponse, LayoutCreatedResponse};
use crate::domain::entities::NewPlace;
use crate::shared::error::AppError;
use crate::shared::validation::validation_error;
use crate::startup::AppState;

use super::{booking_service, map_admin_booking_error};

/// Create a coworking
pub async fn create_coworking(
    State(state): State<AppState>,
    Json(body): Json<CreateCoworkingRequest>,
) -> Result<(StatusCode, Json<CoworkingResponse>), AppError> {
    body.validate().map_err(validation_error)?;

    let coworking = booking_service(&state)
        .create_coworking(body.name, body.address)
        .await
        .map_err(map_admin_booking_error)?;

    Ok((StatusCode::CREATED, Json(coworking.into())))
}

/// Update a coworking's name and address
pub async fn update_coworking(
    State(state): State<AppState>,
    Path(coworking_id): Path<Uuid>,
    Json(body): Json<UpdateCoworkingRequest>,
) -> Result<StatusCode, AppError> {
    body.validate().map_err(validation_error)?;

    booking_service(&state)
        .update_coworking(coworking_id, body.name, body.address)
        .await
        .map_err(map_admin_booking_error)?;

    Ok(StatusCode::ACCEPTED)
}

/// Reactivate a coworking
pub async fn activate_coworking(
    State(state): State<AppState>,
    Path(coworking_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    booking_service(&state)
        .set_coworking_active(coworking_id)
        .await
        .map_err(map_admin_booking_error)?;

    Ok(StatusCode::ACCEPTED)
}

/// Deactivate a coworking; refused while it has active bookings
pub async fn deactivate_coworking(
    State(state): State<AppState>,
    Path(coworking_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    booking_service(&state)
        .set_coworking_inactive(coworking_id)
        .await
        .map_err(map_admin_booking_error)?;

    Ok(StatusCode::ACCEPTED)
}

/// Batch-create places in a coworking
pub async fn create_places(
    State(state): State<AppState>,
    Path(coworking_id): Path<Uuid>,
    Json(body): Json<CreatePlacesRequest>,
) -> Result<StatusCode, AppError> {
    body.validate().map_err(validation_error)?;

    let places = body
        .places
        .into_iter()
        .map(|p| NewPlace {
            label: p.label,
            place_type: p.place_type,
        })
        .collect();

    booking_service(&state)
        .create_places(coworking_id, places)
        .await
        .map_err(map_admin_booking_error)?;

    Ok(StatusCode::CREATED)
}

/// Flip a place's activity; deactivation is refused while the place has
/// active bookings
pub async fn set_place_active(
    State(state): State<AppState>,
    Path(place_id): Path<Uuid>,
    Json(body): Json<SetPlaceActiveRequest>,
) -> Result<StatusCode, AppError> {
    booking_service(&state)
        .set_place_active(place_id, body.active)
        .await
        .map_err(map_admin_booking_error)?;

    Ok(StatusCode::ACCEPTED)
}

/// Append a layout version for a coworking
pub async fn create_layout(
    State(state): State<AppState>,
    Path(coworking_id): Path<Uuid>,
    Json(layout): Json<serde_json::Value>,
) -> Result<(StatusCode, Json<LayoutCreatedResponse>), AppError> {
    let version = booking_service(&state)
        .create_layout_version(coworking_id, layout)
        .await
        .map_err(map_admin_booking_error)?;

    Ok((StatusCode::CREATED, Json(LayoutCreatedResponse { version })))
}

/// Delete the newest layout version
pub async fn rollback_layout(
    State(state): State<AppState>,
    Path(coworking_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    booking_service(&state)
        .rollback_latest_layout_version(coworking_id)
        .await
        .map_err(map_admin_booking_error)?;

    Ok(StatusCode::ACCEPTED)
}
