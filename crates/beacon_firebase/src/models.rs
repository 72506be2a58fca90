//! Models for the notification API
//!
//! Request and response bodies use camelCase field names, matching the mobile
//! clients that call this service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The kind of notification, taken from the request `type` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationKind {
    FeedingReminder,
    SleepReminder,
    DiaperReminder,
    DevelopmentReminder,
    DailySummary,
    Test,
    Other(String),
}

impl NotificationKind {
    pub fn parse(kind: &str) -> Self {
        match kind {
            "feeding_reminder" => Self::FeedingReminder,
            "sleep_reminder" => Self::SleepReminder,
            "diaper_reminder" => Self::DiaperReminder,
            "development_reminder" => Self::DevelopmentReminder,
            "daily_summary" => Self::DailySummary,
            "test" => Self::Test,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::FeedingReminder => "feeding_reminder",
            Self::SleepReminder => "sleep_reminder",
            Self::DiaperReminder => "diaper_reminder",
            Self::DevelopmentReminder => "development_reminder",
            Self::DailySummary => "daily_summary",
            Self::Test => "test",
            Self::Other(kind) => kind,
        }
    }

    pub fn default_title(&self) -> &'static str {
        match self {
            Self::FeedingReminder => "🍼 Feeding Time",
            Self::SleepReminder => "😴 Sleep Time",
            Self::DiaperReminder => "👶 Diaper Change",
            Self::DevelopmentReminder => "📏 Development Check",
            Self::DailySummary => "📊 Daily Summary",
            Self::Test => "🧪 Test Notification",
            Self::Other(_) => "Baby Tracker",
        }
    }

    pub fn default_body(&self) -> &'static str {
        match self {
            Self::FeedingReminder => "It's time to feed your baby!",
            Self::SleepReminder => "It's time for your baby to sleep!",
            Self::DiaperReminder => "It's time for a diaper change!",
            Self::DevelopmentReminder => "It's time to record your baby's growth!",
            Self::DailySummary => "Check today's activities.",
            Self::Test => "Firebase notifications are working!",
            Self::Other(_) => "New notification",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request body for `POST /send-notification`
///
/// `type` and `userId` are required; they are optional here so that a missing
/// field is reported as a 400 with a JSON body rather than a rejection.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SendNotificationRequest {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub user_id: Option<String>,
    pub baby_id: Option<String>,
    /// Overrides the default title for `type`
    pub title: Option<String>,
    /// Overrides the default body for `type`
    pub body: Option<String>,
    /// Extra data for the app. Non-string values are sent as their JSON text.
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub data: Option<HashMap<String, serde_json::Value>>,
}

/// Response body for a delivered notification
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SendNotificationResponse {
    pub success: bool,
    /// FCM message name, `projects/{project_id}/messages/{message_id}`
    pub message_id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Request body for `POST /register-device`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RegisterDeviceRequest {
    pub user_id: Option<String>,
    /// FCM registration token
    pub token: Option<String>,
    pub device_id: Option<String>,
}

/// Response body for `POST /register-device`
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RegisterDeviceResponse {
    pub success: bool,
    pub user_id: String,
    pub device_id: Option<String>,
}

/// JSON error body: `{"error": "...", "details": "..."}`
#[derive(Debug, Clone, Deserialize, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// A device registration token for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceToken {
    pub user_id: String,
    pub token: String,
    pub device_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DeviceToken {
    pub fn new(user_id: String, token: String, device_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            token,
            device_id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One row per delivered notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationLogEntry {
    pub user_id: String,
    pub baby_id: Option<String>,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub fcm_response: serde_json::Value,
    pub sent_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trip_and_defaults() {
        let kind = NotificationKind::parse("feeding_reminder");
        assert_eq!(kind, NotificationKind::FeedingReminder);
        assert_eq!(kind.as_str(), "feeding_reminder");
        assert_eq!(kind.default_title(), "🍼 Feeding Time");

        let other = NotificationKind::parse("vaccination");
        assert_eq!(other.to_string(), "vaccination");
        assert_eq!(other.default_title(), "Baby Tracker");
        assert_eq!(other.default_body(), "New notification");
    }

    #[test]
    fn test_request_uses_camel_case() {
        let req: SendNotificationRequest = serde_json::from_str(
            r#"{"type":"test","userId":"u1","babyId":"b1","data":{"count":3}}"#,
        )
        .unwrap();
        assert_eq!(req.kind.as_deref(), Some("test"));
        assert_eq!(req.user_id.as_deref(), Some("u1"));
        assert_eq!(req.baby_id.as_deref(), Some("b1"));
        assert_eq!(req.data.unwrap()["count"], 3);
    }

    #[test]
    fn test_response_shape() {
        let value = serde_json::to_value(SendNotificationResponse {
            success: true,
            message_id: "projects/p/messages/1".to_string(),
            kind: "test".to_string(),
        })
        .unwrap();
        assert_eq!(
            value,
            serde_json::json!({"success": true, "messageId": "projects/p/messages/1", "type": "test"})
        );
    }

    #[test]
    fn test_error_response_omits_empty_details() {
        let value = serde_json::to_value(ErrorResponse {
            error: "FCM token not found for user".to_string(),
            details: None,
        })
        .unwrap();
        assert_eq!(value, serde_json::json!({"error": "FCM token not found for user"}));
    }
}
