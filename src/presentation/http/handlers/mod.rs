//! HTTP Handlers
//!
//! Request handlers plus the deterministic mapping from domain errors to
//! HTTP status codes.

pub mod admin;
pub mod auth;
pub mod booking;
pub mod coworking;
pub mod health;
pub mod user;

use std::sync::Arc;

use crate::application::services::{BookingError, BookingService, SessionError, SessionService};
use crate::infrastructure::database::Store;
use crate::infrastructure::repositories::{
    PgBookingRepository, PgCoworkingRepository, PgOutboxRepository, PgPlaceRepository,
    PgSessionRepository, PgUserRepository,
};
use crate::shared::error::AppError;
use crate::startup::AppState;

pub(crate) type AppSessionService =
    SessionService<PgUserRepository, PgSessionRepository, Store>;

pub(crate) type AppBookingService = BookingService<
    PgBookingRepository,
    PgPlaceRepository,
    PgCoworkingRepository,
    PgOutboxRepository,
    Store,
>;

/// Build the session core against the request's application state.
pub(crate) fn session_service(state: &AppState) -> AppSessionService {
    SessionService::new(
        Arc::new(PgUserRepository::new(state.db.clone())),
        Arc::new(PgSessionRepository::new(state.db.clone())),
        Arc::clone(&state.token_authority),
        state.store.clone(),
        state.settings.hasher.cost,
        state.settings.auth.refresh_token_ttl,
    )
}

/// Build the booking core against the request's application state.
pub(crate) fn booking_service(state: &AppState) -> AppBookingService {
    BookingService::new(
        Arc::new(PgBookingRepository::new(state.db.clone())),
        Arc::new(PgPlaceRepository::new(state.db.clone())),
        Arc::new(PgCoworkingRepository::new(state.db.clone())),
        Arc::new(PgOutboxRepository::new(state.db.clone())),
        state.store.clone(),
    )
}

/// Deterministic session-error → status mapping.
pub(crate) fn map_session_error(err: SessionError) -> AppError {
    match err {
        SessionError::EmptyEmail
        | SessionError::EmptyPassword
        | SessionError::EmptyRoleCode
        | SessionError::EmptyToken => AppError::BadRequest(err.to_string()),
        SessionError::RoleNotFound => AppError::BadRequest(err.to_string()),
        SessionError::UserAlreadyExists => AppError::Conflict(err.to_string()),
        SessionError::InvalidCredentials
        | SessionError::UserNotFound
        | SessionError::UserInactive
        | SessionError::InvalidRefreshToken
        | SessionError::SessionNotFound
        | SessionError::SessionExpired => AppError::Unauthorized(err.to_string()),
        SessionError::CannotGenerateTokens
        | SessionError::CannotRevokeSession
        | SessionError::CannotUpdateSession
        | SessionError::CannotRegisterUser
        | SessionError::CannotFetchSessions
        | SessionError::Storage(_) => AppError::Internal(err.to_string()),
    }
}

/// Deterministic booking-error → status mapping for the public and
/// user-facing routes, whose contracts answer bad ids with 400.
pub(crate) fn map_booking_error(err: BookingError) -> AppError {
    match err {
        BookingError::StartAfterEnd
        | BookingError::StartEqualsEnd
        | BookingError::StartInPast
        | BookingError::NotMultipleOfHour
        | BookingError::DurationLessThanOneHour
        | BookingError::DurationMoreThanThreeHours
        | BookingError::BookingNotFound
        | BookingError::AlreadyCancelled
        | BookingError::AlreadyCompleted
        | BookingError::BookingTimeConflict
        | BookingError::PlaceNotFound
        | BookingError::CoworkingNotFound
        | BookingError::PlaceInactive
        | BookingError::CoworkingInactive
        | BookingError::InvalidLayoutSchema
        | BookingError::InvalidLayoutSchemaVersion => AppError::BadRequest(err.to_string()),
        BookingError::PlaceHasActiveBookings | BookingError::CoworkingHasActiveBookings => {
            AppError::Conflict(err.to_string())
        }
        BookingError::CannotCreateBooking
        | BookingError::CannotCancelBooking
        | BookingError::CannotCompleteBooking
        | BookingError::CannotFetchBooking
        | BookingError::CannotCreateCoworking
        | BookingError::CannotUpdateCoworking
        | BookingError::CannotFetchCoworking
        | BookingError::CannotCreatePlace
        | BookingError::CannotUpdatePlace
        | BookingError::CannotFetchPlace
        | BookingError::CannotCreateLayout
        | BookingError::CannotFetchLayout
        | BookingError::Storage(_) => AppError::Internal(err.to_string()),
    }
}

/// Mapping for the admin mutation routes, whose contract answers a missing
/// place or coworking with 404.
pub(crate) fn map_admin_booking_error(err: BookingError) -> AppError {
    match err {
        BookingError::PlaceNotFound | BookingError::CoworkingNotFound => {
            AppError::NotFound(err.to_string())
        }
        other => map_booking_error(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_catalogue_ids_are_bad_requests_outside_admin() {
        assert!(matches!(
            map_booking_error(BookingError::CoworkingNotFound),
            AppError::BadRequest(_)
        ));
        assert!(matches!(
            map_booking_error(BookingError::PlaceNotFound),
            AppError::BadRequest(_)
        ));
        assert!(matches!(
            map_booking_error(BookingError::BookingNotFound),
            AppError::BadRequest(_)
        ));
    }

    #[test]
    fn admin_mutations_report_missing_ids_as_not_found() {
        assert!(matches!(
            map_admin_booking_error(BookingError::CoworkingNotFound),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            map_admin_booking_error(BookingError::PlaceNotFound),
            AppError::NotFound(_)
        ));
        // everything else falls through to the shared mapping
        assert!(matches!(
            map_admin_booking_error(BookingError::PlaceHasActiveBookings),
            AppError::Conflict(_)
        ));
        assert!(matches!(
            map_admin_booking_error(BookingError::NotMultipleOfHour),
            AppError::BadRequest(_)
        ));
    }
}
