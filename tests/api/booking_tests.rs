//! Booking API Tests
//!
//! Validation-path tests: every request here is rejected before the first
//! database access, so no infrastructure is needed.

use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use crate::common::{mint_tokens, TestApp};
use coworking_server::domain::entities::RoleCode;

async fn create_booking_expecting_400(start: &str, end: &str) {
    let app = TestApp::new();
    let (_, tokens) = mint_tokens(&[RoleCode::Student]);

    let body = json!({
        "placeId": Uuid::new_v4(),
        "startTime": start,
        "endTime": end
    });
    let response = app
        .post_json_auth("/bookings", &body.to_string(), &tokens.access_token)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn booking_off_the_hour_grid_is_rejected() {
    create_booking_expecting_400("2030-01-01T10:30:00Z", "2030-01-01T11:30:00Z").await;
}

#[tokio::test]
async fn booking_with_start_after_end_is_rejected() {
    create_booking_expecting_400("2030-01-01T12:00:00Z", "2030-01-01T11:00:00Z").await;
}

#[tokio::test]
async fn booking_longer_than_three_hours_is_rejected() {
    create_booking_expecting_400("2030-01-01T09:00:00Z", "2030-01-01T13:00:00Z").await;
}

#[tokio::test]
async fn booking_in_the_past_is_rejected() {
    create_booking_expecting_400("2000-01-01T10:00:00Z", "2000-01-01T11:00:00Z").await;
}

#[tokio::test]
async fn bookings_require_authentication() {
    let app = TestApp::new();

    let body = json!({
        "placeId": Uuid::new_v4(),
        "startTime": "2030-01-01T10:00:00Z",
        "endTime": "2030-01-01T11:00:00Z"
    });
    let response = app.post_json("/bookings", &body.to_string()).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn available_places_rejects_inverted_interval() {
    let app = TestApp::new();

    let uri = format!(
        "/coworkings/{}/available-places?startTime=2030-01-01T12:00:00Z&endTime=2030-01-01T10:00:00Z",
        Uuid::new_v4()
    );
    let response = app.get(&uri).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
