use axum::{
    http::{header, HeaderName, Method},
    routing::post,
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::handlers::{register_device_handler, send_notification_handler, FirebaseState};
use crate::service::NotificationService;

/// CORS for browser and mobile web callers: any origin, preflight answered.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
            header::CONTENT_TYPE,
        ])
}

/// Notification API routes
///
/// * `POST /send-notification`
/// * `POST /register-device`
pub fn routes(service: Arc<NotificationService>) -> Router {
    let state = Arc::new(FirebaseState { service });

    info!("Notification routes initialized");

    Router::new()
        .route("/send-notification", post(send_notification_handler))
        .route("/register-device", post(register_device_handler))
        .layer(cors_layer())
        .with_state(state)
}
