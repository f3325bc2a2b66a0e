//! Route Configuration
//!
//! Configures the HTTP surface: public auth and catalogue routes, protected
//! user/booking routes, and admin routes behind the role gate.

use axum::{
    middleware,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};

use super::handlers;
use crate::infrastructure::metrics;
use crate::presentation::middleware::{admin_middleware, auth_middleware};
use crate::startup::AppState;

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(auth_routes())
        .merge(user_routes(state.clone()))
        .merge(booking_routes(state.clone()))
        .merge(coworking_routes())
        .merge(admin_routes(state.clone()))
        // Health and metrics
        .route("/health", get(handlers::health::health_check))
        .route("/health/ready", get(handlers::health::readiness))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Prometheus metrics endpoint handler
async fn metrics_handler() -> impl IntoResponse {
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        metrics::gather_metrics(),
    )
}

/// Authentication routes (public)
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/refresh", post(handlers::auth::refresh))
        .route("/auth/logout", post(handlers::auth::logout))
}

/// User and session routes (protected)
fn user_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/users/me", get(handlers::user::me))
        .route("/users/sessions/active", get(handlers::user::active_sessions))
        .route("/users/sessions/all", get(handlers::user::all_sessions))
        .route("/users/sessions/revoke", post(handlers::user::revoke_session))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Booking routes (protected)
fn booking_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/bookings", post(handlers::booking::create_booking))
        .route("/bookings", get(handlers::booking::list_my_bookings))
        .route("/bookings/:booking_id", get(handlers::booking::get_booking))
        .route("/bookings/:booking_id", delete(handlers::booking::cancel_booking))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Public coworking catalogue routes
fn coworking_routes() -> Router<AppState> {
    Router::new()
        .route("/coworkings", get(handlers::coworking::list_coworkings))
        .route("/coworkings/:coworking_id", get(handlers::coworking::get_coworking))
        .route(
            "/coworkings/:coworking_id/places",
            get(handlers::coworking::get_places),
        )
        .route(
            "/coworkings/:coworking_id/available-places",
            get(handlers::coworking::get_available_places),
        )
        .route(
            "/coworkings/:coworking_id/layout",
            get(handlers::coworking::get_layout),
        )
}

/// Admin routes (role-gated)
fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/coworkings/:coworking_id/layouts",
            get(handlers::coworking::list_layout_versions),
        )
        .route(
            "/coworkings/:coworking_id/layouts/:version",
            get(handlers::coworking::get_layout_by_version),
        )
        .route("/admin/coworkings", post(handlers::admin::create_coworking))
        .route(
            "/admin/coworkings/:coworking_id",
            put(handlers::admin::update_coworking),
        )
        .route(
            "/admin/coworkings/:coworking_id/activate",
            put(handlers::admin::activate_coworking),
        )
        .route(
            "/admin/coworkings/:coworking_id/deactivate",
            put(handlers::admin::deactivate_coworking),
        )
        .route(
            "/admin/coworkings/:coworking_id/places",
            post(handlers::admin::create_places),
        )
        .route(
            "/admin/places/:place_id/active",
            put(handlers::admin::set_place_active),
        )
        .route(
            "/admin/coworkings/:coworking_id/layouts",
            post(handlers::admin::create_layout),
        )
        .route(
            "/admin/coworkings/:coworking_id/layouts/rollback",
            post(handlers::admin::rollback_layout),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), admin_middleware))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
