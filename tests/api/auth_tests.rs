//! Authentication API Tests
//!
//! These exercise the HTTP edge up to the first database access, so they
//! run without any infrastructure: request validation, token parsing, and
//! the authorization middleware.

use axum::http::StatusCode;
use serde_json::json;

use crate::common::{mint_tokens, TestApp};
use coworking_server::domain::entities::RoleCode;

#[tokio::test]
async fn register_with_invalid_email_fails() {
    let app = TestApp::new();

    let body = json!({
        "email": "not-an-email",
        "password": "ValidPassword123",
        "roleCode": "student"
    });
    let response = app.post_json("/auth/register", &body.to_string()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn register_with_short_password_fails() {
    let app = TestApp::new();

    let body = json!({
        "email": "someone@example.com",
        "password": "short",
        "roleCode": "student"
    });
    let response = app.post_json("/auth/register", &body.to_string()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn register_with_unknown_role_fails_before_storage() {
    let app = TestApp::new();

    let body = json!({
        "email": "someone@example.com",
        "password": "ValidPassword123",
        "roleCode": "wizard"
    });
    let response = app.post_json("/auth/register", &body.to_string()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_with_empty_password_fails() {
    let app = TestApp::new();

    let body = json!({ "email": "someone@example.com", "password": "" });
    let response = app.post_json("/auth/login", &body.to_string()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn refresh_with_malformed_token_is_unauthorized() {
    let app = TestApp::new();

    let body = json!({ "refresh_token": "not-a-jwt" });
    let response = app.post_json("/auth/refresh", &body.to_string()).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_rejects_an_access_token() {
    let app = TestApp::new();
    let (_, tokens) = mint_tokens(&[RoleCode::Student]);

    // wrong kind of token: signed with the access key
    let body = json!({ "refresh_token": tokens.access_token });
    let response = app.post_json("/auth/refresh", &body.to_string()).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_with_malformed_token_is_unauthorized() {
    let app = TestApp::new();

    let body = json!({ "refresh_token": "garbage" });
    let response = app.post_json("/auth/logout", &body.to_string()).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_route_without_token_is_unauthorized() {
    let app = TestApp::new();

    let response = app.get("/users/me").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_route_with_garbage_token_is_unauthorized() {
    let app = TestApp::new();

    let response = app.get_auth("/users/me", "garbage").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_route_rejects_non_admin() {
    let app = TestApp::new();
    let (_, tokens) = mint_tokens(&[RoleCode::Student]);

    let body = json!({ "name": "Downtown", "address": "1 Main St" });
    let response = app
        .post_json_auth("/admin/coworkings", &body.to_string(), &tokens.access_token)
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
