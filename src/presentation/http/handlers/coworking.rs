//! Coworking Handlers (public reads + admin layout reads)

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::application::dto::request::AvailablePlacesQuery;
use crate::application::dto::response::{
    CoworkingPlacesResponse, CoworkingResponse, LayoutResponse, LayoutVersionResponse,
};
use crate::shared::error::AppError;
use crate::startup::AppState;

use super::{booking_service, map_booking_error};

/// List all coworkings
pub async fn list_coworkings(
    State(state): State<AppState>,
) -> Result<Json<Vec<CoworkingResponse>>, AppError> {
    let coworkings = booking_service(&state)
        .list_coworkings()
        .await
        .map_err(map_booking_error)?;

    Ok(Json(coworkings.into_iter().map(CoworkingResponse::from).collect()))
}

/// Fetch one coworking
pub async fn get_coworking(
    State(state): State<AppState>,
    Path(coworking_id): Path<Uuid>,
) -> Result<Json<CoworkingResponse>, AppError> {
    let coworking = booking_service(&state)
        .get_coworking(coworking_id)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(coworking.into()))
}

/// A coworking with all of its places (nested view assembled here)
pub async fn get_places(
    State(state): State<AppState>,
    Path(coworking_id): Path<Uuid>,
) -> Result<Json<CoworkingPlacesResponse>, AppError> {
    let service = booking_service(&state);

    let coworking = service
        .get_coworking(coworking_id)
        .await
        .map_err(map_booking_error)?;
    let places = service
        .get_places_by_coworking(coworking_id)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(CoworkingPlacesResponse::assemble(coworking, places)))
}

/// Places free over the whole requested interval
pub async fn get_available_places(
    State(state): State<AppState>,
    Path(coworking_id): Path<Uuid>,
    Query(query): Query<AvailablePlacesQuery>,
) -> Result<Json<CoworkingPlacesResponse>, AppError> {
    if query.start_time >= query.end_time {
        return Err(AppError::BadRequest(
            "startTime must precede endTime".into(),
        ));
    }

    let service = booking_service(&state);

    let coworking = service
        .get_coworking(coworking_id)
        .await
        .map_err(map_booking_error)?;
    let places = service
        .get_available_places_by_coworking(coworking_id, query.start_time, query.end_time)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(CoworkingPlacesResponse::assemble(coworking, places)))
}

/// Latest layout version
pub async fn get_layout(
    State(state): State<AppState>,
    Path(coworking_id): Path<Uuid>,
) -> Result<Json<LayoutResponse>, AppError> {
    let layout = booking_service(&state)
        .get_latest_layout(coworking_id)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(layout.into()))
}

/// All layout versions (admin)
pub async fn list_layout_versions(
    State(state): State<AppState>,
    Path(coworking_id): Path<Uuid>,
) -> Result<Json<Vec<LayoutVersionResponse>>, AppError> {
    let versions = booking_service(&state)
        .list_layout_versions(coworking_id)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(versions.into_iter().map(LayoutVersionResponse::from).collect()))
}

/// One layout version (admin)
pub async fn get_layout_by_version(
    State(state): State<AppState>,
    Path((coworking_id, version)): Path<(Uuid, i32)>,
) -> Result<Json<LayoutResponse>, AppError> {
    let layout = booking_service(&state)
        .get_layout_by_version(coworking_id, version)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(layout.into()))
}
