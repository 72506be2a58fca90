//! Notification delivery.
//!
//! [`NotificationService`] ties the device token store, the FCM client and
//! the notification log together. [`FirebaseServiceFactory`] wires one from
//! the application configuration.

use beacon_auth::TokenIssuer;
use beacon_config::AppConfig;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::client::{FcmMessage, FirebaseClient, FirebaseError, Message, Notification};
use crate::models::{
    DeviceToken, NotificationKind, NotificationLogEntry, RegisterDeviceRequest,
    RegisterDeviceResponse, SendNotificationRequest, SendNotificationResponse,
};
use crate::repository::{
    DeviceTokenRepository, InMemoryDeviceTokenRepository, InMemoryNotificationLogRepository,
    NotificationLogRepository,
};
use crate::repository_sql::{connect, SqlDeviceTokenRepository, SqlNotificationLogRepository};

pub struct NotificationService {
    client: FirebaseClient,
    tokens: Arc<dyn DeviceTokenRepository>,
    logs: Arc<dyn NotificationLogRepository>,
}

fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Data sent along with every message: `type`, `userId` and `babyId`,
/// overridden by the caller's own `data` entries.
pub fn message_data(
    kind: &NotificationKind,
    user_id: &str,
    baby_id: Option<&str>,
    extra: Option<HashMap<String, serde_json::Value>>,
) -> HashMap<String, String> {
    let mut data = HashMap::from([
        ("type".to_string(), kind.to_string()),
        ("userId".to_string(), user_id.to_string()),
        ("babyId".to_string(), baby_id.unwrap_or_default().to_string()),
    ]);

    for (key, value) in extra.unwrap_or_default() {
        let value = match value {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        data.insert(key, value);
    }
    data
}

impl NotificationService {
    pub fn new(
        client: FirebaseClient,
        tokens: Arc<dyn DeviceTokenRepository>,
        logs: Arc<dyn NotificationLogRepository>,
    ) -> Self {
        Self {
            client,
            tokens,
            logs,
        }
    }

    pub fn client(&self) -> &FirebaseClient {
        &self.client
    }

    /// Sends one notification to the latest device of `userId`.
    ///
    /// Steps run in order and stop at the first failure: validate, look up
    /// the device token, send through FCM, record the log row. A failed log
    /// write does not fail the call.
    #[instrument(skip_all, fields(kind = request.kind.as_deref().unwrap_or_default()))]
    pub async fn send(
        &self,
        request: SendNotificationRequest,
    ) -> Result<SendNotificationResponse, FirebaseError> {
        let (kind, user_id) = match (required(request.kind), required(request.user_id)) {
            (Some(kind), Some(user_id)) => (NotificationKind::parse(&kind), user_id),
            _ => return Err(FirebaseError::MissingFields("type, userId".to_string())),
        };

        let device = self
            .tokens
            .latest_token(&user_id)
            .await?
            .filter(|d| !d.token.is_empty())
            .ok_or_else(|| FirebaseError::TokenNotFound {
                user_id: user_id.clone(),
            })?;

        let notification = Notification {
            title: required(request.title).unwrap_or_else(|| kind.default_title().to_string()),
            body: required(request.body).unwrap_or_else(|| kind.default_body().to_string()),
        };
        let baby_id = request.baby_id.filter(|b| !b.is_empty());

        let message = FcmMessage {
            message: Message {
                token: device.token,
                notification: Some(notification.clone()),
                data: message_data(&kind, &user_id, baby_id.as_deref(), request.data),
            },
        };

        let response = self.client.send_message(&message).await?;

        let entry = NotificationLogEntry {
            user_id: user_id.clone(),
            baby_id,
            kind: kind.to_string(),
            title: notification.title,
            body: notification.body,
            fcm_response: serde_json::to_value(&response).unwrap_or_default(),
            sent_at: Utc::now(),
        };
        if let Err(err) = self.logs.append(entry).await {
            error!("Failed to record notification log: {}", err);
        }

        info!("Notification {} sent to user {}", kind, user_id);
        Ok(SendNotificationResponse {
            success: true,
            message_id: response.name,
            kind: kind.to_string(),
        })
    }

    /// Stores or refreshes a device token for a user.
    pub async fn register_device(
        &self,
        request: RegisterDeviceRequest,
    ) -> Result<RegisterDeviceResponse, FirebaseError> {
        let (user_id, token) = match (required(request.user_id), required(request.token)) {
            (Some(user_id), Some(token)) => (user_id, token),
            _ => return Err(FirebaseError::MissingFields("userId, token".to_string())),
        };

        let stored = self
            .tokens
            .upsert_token(DeviceToken::new(user_id, token, required(request.device_id)))
            .await?;

        info!("Registered device token for user {}", stored.user_id);
        Ok(RegisterDeviceResponse {
            success: true,
            user_id: stored.user_id,
            device_id: stored.device_id,
        })
    }
}

/// Builds a [`NotificationService`] from the application configuration.
pub struct FirebaseServiceFactory {
    config: Arc<AppConfig>,
}

impl FirebaseServiceFactory {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self { config }
    }

    /// Stores tokens and logs in SQLite when `[database] url` is set, in
    /// memory otherwise.
    pub async fn notification_service(&self) -> Result<NotificationService, FirebaseError> {
        let url = self
            .config
            .database
            .as_ref()
            .map(|db| db.url.trim())
            .filter(|url| !url.is_empty());

        match url {
            Some(url) => {
                let pool = connect(url).await?;
                let tokens = SqlDeviceTokenRepository::new(pool.clone());
                tokens.init_schema().await?;
                let logs = SqlNotificationLogRepository::new(pool);
                logs.init_schema().await?;
                self.notification_service_with(Arc::new(tokens), Arc::new(logs))
            }
            None => {
                warn!("No [database] configured; device tokens are kept in memory only");
                self.notification_service_with(
                    Arc::new(InMemoryDeviceTokenRepository::new()),
                    Arc::new(InMemoryNotificationLogRepository::new()),
                )
            }
        }
    }

    pub fn notification_service_with(
        &self,
        tokens: Arc<dyn DeviceTokenRepository>,
        logs: Arc<dyn NotificationLogRepository>,
    ) -> Result<NotificationService, FirebaseError> {
        let firebase = self.config.firebase.clone().unwrap_or_else(|| {
            warn!("No [firebase] section configured; sends will fail until it is set");
            Default::default()
        });
        let issuer = TokenIssuer::from_config(&self.config.oauth)?;
        let client = FirebaseClient::new(&firebase, issuer)?
            .with_timeout(self.config.oauth.request_timeout_secs)?;
        Ok(NotificationService::new(client, tokens, logs))
    }
}
