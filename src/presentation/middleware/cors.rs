//! CORS Middleware Configuration

use tower_http::cors::{Any, CorsLayer};

/// Create a permissive CORS layer
pub fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}
