//! HTTP handlers for the notification API
//!
//! Errors are answered as `{"error": ..., "details": ...}` with the status
//! from [`HttpStatusCode`]: 400 for missing fields, 404 when the user has no
//! device token, 500 for configuration, token issuance and FCM failures.

use axum::{
    extract::{rejection::JsonRejection, Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use beacon_common::HttpStatusCode;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::client::FirebaseError;
use crate::models::{ErrorResponse, RegisterDeviceRequest, SendNotificationRequest};
use crate::service::NotificationService;

/// Shared state for the notification handlers
#[derive(Clone)]
pub struct FirebaseState {
    pub service: Arc<NotificationService>,
}

fn error_response(err: FirebaseError) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        error!("Notification request failed: {}", err);
    } else {
        warn!("Notification request rejected: {}", err);
    }

    (
        status,
        Json(ErrorResponse {
            error: err.public_message(),
            details: err.details(),
        }),
    )
        .into_response()
}

fn invalid_body(rejection: JsonRejection) -> Response {
    warn!("Invalid JSON body: {}", rejection.body_text());
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: "Invalid JSON body".to_string(),
            details: Some(rejection.body_text()),
        }),
    )
        .into_response()
}

/// Sends a push notification to the latest device of a user
#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/send-notification",
    request_body = SendNotificationRequest,
    responses(
        (status = 200, description = "Notification sent", body = crate::models::SendNotificationResponse),
        (status = 400, description = "Missing type or userId", body = ErrorResponse),
        (status = 404, description = "No FCM token for the user", body = ErrorResponse),
        (status = 500, description = "Not configured, token issuance or FCM failure", body = ErrorResponse)
    ),
    tag = "Notifications"
))]
pub async fn send_notification_handler(
    State(state): State<Arc<FirebaseState>>,
    payload: Result<Json<SendNotificationRequest>, JsonRejection>,
) -> Response {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return invalid_body(rejection),
    };
    debug!(
        "Send notification request: type={:?} user={:?}",
        payload.kind, payload.user_id
    );

    match state.service.send(payload).await {
        Ok(response) => Json(response).into_response(),
        Err(err) => error_response(err),
    }
}

/// Registers or refreshes the FCM token of a user's device
#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/register-device",
    request_body = RegisterDeviceRequest,
    responses(
        (status = 200, description = "Device registered", body = crate::models::RegisterDeviceResponse),
        (status = 400, description = "Missing userId or token", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    ),
    tag = "Notifications"
))]
pub async fn register_device_handler(
    State(state): State<Arc<FirebaseState>>,
    payload: Result<Json<RegisterDeviceRequest>, JsonRejection>,
) -> Response {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return invalid_body(rejection),
    };

    match state.service.register_device(payload).await {
        Ok(response) => Json(response).into_response(),
        Err(err) => error_response(err),
    }
}
