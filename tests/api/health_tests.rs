//! Health & Metrics Endpoint Tests

use axum::http::StatusCode;

use crate::common::TestApp;

#[tokio::test]
async fn health_check_reports_healthy() {
    let app = TestApp::new();

    let response = app.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn metrics_endpoint_renders_prometheus_text() {
    let app = TestApp::new();

    let response = app.get("/metrics").await;
    assert_eq!(response.status(), StatusCode::OK);
}
