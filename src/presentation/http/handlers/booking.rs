//! Booking Handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::application::dto::request::{CancelBookingRequest, CreateBookingRequest};
use crate::application::dto::response::BookingResponse;
use crate::domain::entities::RoleCode;
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

use super::{booking_service, map_booking_error};

/// Create a reservation for the authenticated user
pub async fn create_booking(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let booking = booking_service(&state)
        .create_booking(user.user_id, body.place_id, body.start_time, body.end_time)
        .await
        .map_err(map_booking_error)?;

    Ok((StatusCode::CREATED, Json(booking.into())))
}

/// Fetch one booking; owners and admins only
pub async fn get_booking(
    State(state): State<AppState>,
    user: AuthUser,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = booking_service(&state)
        .get_booking(booking_id)
        .await
        .map_err(map_booking_error)?;

    if booking.user_id != user.user_id && !state.authorizer.check(&user.roles, &[RoleCode::Admin])
    {
        return Err(AppError::Forbidden("Not your booking".into()));
    }

    Ok(Json(booking.into()))
}

/// The authenticated user's bookings, newest start first
pub async fn list_my_bookings(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let bookings = booking_service(&state)
        .list_bookings_by_user(user.user_id)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(bookings.into_iter().map(BookingResponse::from).collect()))
}

/// Cancel a booking; owners and admins only. The optional JSON body carries
/// a cancellation reason.
pub async fn cancel_booking(
    State(state): State<AppState>,
    user: AuthUser,
    Path(booking_id): Path<Uuid>,
    body: Option<Json<CancelBookingRequest>>,
) -> Result<StatusCode, AppError> {
    let service = booking_service(&state);

    let booking = service
        .get_booking(booking_id)
        .await
        .map_err(map_booking_error)?;
    if booking.user_id != user.user_id && !state.authorizer.check(&user.roles, &[RoleCode::Admin])
    {
        return Err(AppError::Forbidden("Not your booking".into()));
    }

    let reason = body.and_then(|Json(b)| b.reason);
    service
        .cancel_booking(booking_id, reason)
        .await
        .map_err(map_booking_error)?;

    Ok(StatusCode::ACCEPTED)
}
