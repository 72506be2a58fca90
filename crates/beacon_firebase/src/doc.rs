use utoipa::OpenApi;

use crate::client::{FcmMessage, Message, Notification};
use crate::models::{
    ErrorResponse, RegisterDeviceRequest, RegisterDeviceResponse, SendNotificationRequest,
    SendNotificationResponse,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::send_notification_handler,
        crate::handlers::register_device_handler,
    ),
    components(
        schemas(
            SendNotificationRequest,
            SendNotificationResponse,
            RegisterDeviceRequest,
            RegisterDeviceResponse,
            ErrorResponse,
            FcmMessage,
            Message,
            Notification,
        )
    ),
    tags(
        (name = "Notifications", description = "Push notifications through Firebase Cloud Messaging")
    ),
    servers(
        (url = "/api", description = "Beacon API server")
    )
)]
pub struct FirebaseApiDoc;
