//! End-to-End Scenarios (database-gated)
//!
//! These run the real services against PostgreSQL and are skipped unless
//! `TEST_DATABASE_URL` points at a reachable instance. Each test seeds its
//! own coworking and places, so they are independent and can run in
//! parallel.

use chrono::{DateTime, TimeZone, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::common::{
    booking_service, session_service, test_pool, token_authority, unique_email,
};
use coworking_server::application::services::{BookingError, SessionError};
use coworking_server::domain::entities::{DeviceContext, NewPlace};

macro_rules! require_pool {
    () => {
        match test_pool().await {
            Some(pool) => pool,
            None => {
                eprintln!("skipping: TEST_DATABASE_URL not set");
                return;
            }
        }
    };
}

fn utc(h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, 1, h, 0, 0).unwrap()
}

async fn seed_place(pool: &PgPool) -> Uuid {
    let service = booking_service(pool);
    let coworking = service
        .create_coworking("Test Coworking".into(), "1 Test St".into())
        .await
        .unwrap();
    service
        .create_places(
            coworking.id,
            vec![NewPlace {
                label: "A-1".into(),
                place_type: "desk".into(),
            }],
        )
        .await
        .unwrap();
    let places = service
        .get_places_by_coworking(coworking.id)
        .await
        .unwrap();
    places[0].id
}

async fn outbox_count(pool: &PgPool, aggregate_id: Uuid, event_type: &str) -> i64 {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM outbox_events WHERE aggregate_id = $1 AND event_type = $2",
    )
    .bind(aggregate_id)
    .bind(event_type)
    .fetch_one(pool)
    .await
    .unwrap()
}

#[tokio::test]
async fn register_persists_user_and_session_bound_to_refresh_jti() {
    let pool = require_pool!();
    let service = session_service(&pool);
    let email = unique_email();

    let tokens = service
        .register(&email, "pass1234", "student", DeviceContext::default())
        .await
        .unwrap();

    let claims = token_authority()
        .parse_refresh(&tokens.refresh_token)
        .unwrap();

    let users: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(&email)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(users, 1);

    let sessions: Vec<Uuid> = sqlx::query_scalar(
        "SELECT s.id FROM sessions s JOIN users u ON u.id = s.user_id WHERE LOWER(u.email) = LOWER($1)",
    )
    .bind(&email)
    .fetch_all(&pool)
    .await
    .unwrap();
    assert_eq!(sessions, vec![claims.session_id]);
}

#[tokio::test]
async fn login_with_wrong_password_is_rejected() {
    let pool = require_pool!();
    let service = session_service(&pool);
    let email = unique_email();

    service
        .register(&email, "pass1234", "student", DeviceContext::default())
        .await
        .unwrap();

    let result = service
        .login(&email, "wrong", DeviceContext::default())
        .await;
    assert!(matches!(result, Err(SessionError::InvalidCredentials)));
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let pool = require_pool!();
    let service = session_service(&pool);
    let email = unique_email();

    service
        .register(&email, "pass1234", "student", DeviceContext::default())
        .await
        .unwrap();
    let result = service
        .register(&email, "pass1234", "student", DeviceContext::default())
        .await;
    assert!(matches!(result, Err(SessionError::UserAlreadyExists)));
}

#[tokio::test]
async fn booking_grid_conflict_and_adjacency() {
    let pool = require_pool!();
    let service = booking_service(&pool);
    let place_id = seed_place(&pool).await;
    let user_id = Uuid::new_v4();

    // 10:00-11:00 succeeds
    service
        .create_booking(user_id, place_id, utc(10), utc(11))
        .await
        .unwrap();

    // half-hour offsets fail validation before touching storage
    let off_grid = service
        .create_booking(
            user_id,
            place_id,
            Utc.with_ymd_and_hms(2030, 1, 1, 10, 30, 0).unwrap(),
            Utc.with_ymd_and_hms(2030, 1, 1, 11, 30, 0).unwrap(),
        )
        .await;
    assert!(matches!(off_grid, Err(BookingError::NotMultipleOfHour)));

    // the identical interval conflicts
    let overlap = service
        .create_booking(user_id, place_id, utc(10), utc(11))
        .await;
    assert!(matches!(overlap, Err(BookingError::BookingTimeConflict)));

    // [11:00, 12:00) touches [10:00, 11:00) only at the boundary
    service
        .create_booking(user_id, place_id, utc(11), utc(12))
        .await
        .unwrap();
}

#[tokio::test]
async fn concurrent_creates_on_one_interval_admit_exactly_one() {
    let pool = require_pool!();
    let place_id = seed_place(&pool).await;

    let first = booking_service(&pool);
    let second = booking_service(&pool);
    let (a, b) = tokio::join!(
        first.create_booking(Uuid::new_v4(), place_id, utc(14), utc(15)),
        second.create_booking(Uuid::new_v4(), place_id, utc(14), utc(16)),
    );

    let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(successes, 1, "exactly one of two overlapping creates wins");
    for result in [a, b] {
        if let Err(err) = result {
            assert!(matches!(err, BookingError::BookingTimeConflict));
        }
    }
}

#[tokio::test]
async fn cancel_is_terminal_and_emits_one_event() {
    let pool = require_pool!();
    let service = booking_service(&pool);
    let place_id = seed_place(&pool).await;

    let booking = service
        .create_booking(Uuid::new_v4(), place_id, utc(10), utc(11))
        .await
        .unwrap();
    assert_eq!(outbox_count(&pool, booking.id, "created").await, 1);

    service
        .cancel_booking(booking.id, Some("x".into()))
        .await
        .unwrap();
    assert_eq!(outbox_count(&pool, booking.id, "cancelled").await, 1);

    let again = service.cancel_booking(booking.id, Some("x".into())).await;
    assert!(matches!(again, Err(BookingError::AlreadyCancelled)));
    assert_eq!(outbox_count(&pool, booking.id, "cancelled").await, 1);
}

#[tokio::test]
async fn complete_is_terminal_and_emits_one_event() {
    let pool = require_pool!();
    let service = booking_service(&pool);
    let place_id = seed_place(&pool).await;

    let booking = service
        .create_booking(Uuid::new_v4(), place_id, utc(10), utc(11))
        .await
        .unwrap();

    service.complete_booking(booking.id).await.unwrap();
    assert_eq!(outbox_count(&pool, booking.id, "completed").await, 1);

    let again = service.complete_booking(booking.id).await;
    assert!(matches!(again, Err(BookingError::AlreadyCompleted)));
    assert_eq!(outbox_count(&pool, booking.id, "completed").await, 1);

    let status: String = sqlx::query_scalar("SELECT status FROM bookings WHERE id = $1")
        .bind(booking.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(status, "completed");
}

#[tokio::test]
async fn parallel_refreshes_of_one_token_admit_exactly_one() {
    let pool = require_pool!();
    let service = session_service(&pool);
    let email = unique_email();

    let tokens = service
        .register(&email, "pass1234", "student", DeviceContext::default())
        .await
        .unwrap();

    let second = session_service(&pool);
    let (a, b) = tokio::join!(
        service.refresh(&tokens.refresh_token, DeviceContext::default()),
        second.refresh(&tokens.refresh_token, DeviceContext::default()),
    );

    let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(successes, 1, "a refresh token is single-use");
    for result in [a, b] {
        if let Err(err) = result {
            assert!(matches!(
                err,
                SessionError::InvalidRefreshToken | SessionError::SessionExpired
            ));
        }
    }
}

#[tokio::test]
async fn used_refresh_token_is_rejected_afterwards() {
    let pool = require_pool!();
    let service = session_service(&pool);
    let email = unique_email();

    let tokens = service
        .register(&email, "pass1234", "student", DeviceContext::default())
        .await
        .unwrap();

    let rotated = service
        .refresh(&tokens.refresh_token, DeviceContext::default())
        .await
        .unwrap();

    // the consumed token no longer works; the new one does
    let replay = service
        .refresh(&tokens.refresh_token, DeviceContext::default())
        .await;
    assert!(matches!(replay, Err(SessionError::SessionExpired)));

    service
        .refresh(&rotated.refresh_token, DeviceContext::default())
        .await
        .unwrap();
}

#[tokio::test]
async fn place_with_active_booking_cannot_be_deactivated() {
    let pool = require_pool!();
    let service = booking_service(&pool);
    let place_id = seed_place(&pool).await;

    service
        .create_booking(Uuid::new_v4(), place_id, utc(10), utc(11))
        .await
        .unwrap();

    let result = service.set_place_active(place_id, false).await;
    assert!(matches!(result, Err(BookingError::PlaceHasActiveBookings)));
}

#[tokio::test]
async fn available_places_excludes_overlapping_intervals() {
    let pool = require_pool!();
    let service = booking_service(&pool);

    let coworking = service
        .create_coworking("Availability".into(), "2 Test St".into())
        .await
        .unwrap();
    service
        .create_places(
            coworking.id,
            vec![
                NewPlace {
                    label: "A-1".into(),
                    place_type: "desk".into(),
                },
                NewPlace {
                    label: "A-2".into(),
                    place_type: "desk".into(),
                },
            ],
        )
        .await
        .unwrap();
    let places = service
        .get_places_by_coworking(coworking.id)
        .await
        .unwrap();

    service
        .create_booking(Uuid::new_v4(), places[0].id, utc(10), utc(12))
        .await
        .unwrap();

    let available = service
        .get_available_places_by_coworking(coworking.id, utc(11), utc(13))
        .await
        .unwrap();
    assert_eq!(available.len(), 1);
    assert_eq!(available[0].id, places[1].id);

    // the booked place frees up after its interval
    let later = service
        .get_available_places_by_coworking(coworking.id, utc(12), utc(13))
        .await
        .unwrap();
    assert_eq!(later.len(), 2);
}
