//! Firebase Cloud Messaging client module
//!
//! Sends messages through the FCM HTTP v1 API. Every send obtains a fresh
//! bearer token from [`TokenIssuer`]; nothing is cached between calls.

use beacon_auth::{AuthError, ServiceAccountKey, TokenIssuer};
use beacon_common::{
    config_error, create_client, external_service_error, internal_error, not_found,
    validation_error, BeaconError, HttpStatusCode, DEFAULT_TIMEOUT_SECS,
};
use beacon_config::{env_vars::SECRET_MARKER, FirebaseConfig};
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, error, info};

/// Default FCM API host.
pub const FCM_API_BASE_URL: &str = "https://fcm.googleapis.com";

/// Errors that can occur while delivering a notification
#[derive(Error, Debug)]
pub enum FirebaseError {
    /// Required request fields are missing
    #[error("Missing required fields: {0}")]
    MissingFields(String),

    /// The recipient has no registered device token
    #[error("FCM token not found for user {user_id}")]
    TokenNotFound { user_id: String },

    /// Firebase settings or credentials are absent
    #[error("Firebase not configured: {0}")]
    NotConfigured(String),

    /// Bearer token issuance failed
    #[error("Failed to get access token: {0}")]
    Auth(#[from] AuthError),

    /// Error during HTTP request to Firebase API
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-success answer from the FCM API
    #[error("FCM API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    /// Storage of tokens or logs failed
    #[error("Repository error: {0}")]
    Repository(String),
}

impl FirebaseError {
    /// Short message for the `error` field of an HTTP error body.
    pub fn public_message(&self) -> String {
        match self {
            FirebaseError::MissingFields(fields) => format!("Missing required fields: {fields}"),
            FirebaseError::TokenNotFound { .. } => "FCM token not found for user".to_string(),
            FirebaseError::NotConfigured(_) => "FCM Service Account Key not configured".to_string(),
            FirebaseError::Auth(_) => "Failed to get access token".to_string(),
            FirebaseError::Request(_) | FirebaseError::Api { .. } => {
                "Failed to send notification".to_string()
            }
            FirebaseError::Repository(_) => "Notification storage failed".to_string(),
        }
    }

    /// Supporting detail for the `details` field, when there is any.
    ///
    /// Upstream response bodies are passed through unchanged.
    pub fn details(&self) -> Option<String> {
        match self {
            FirebaseError::MissingFields(_) | FirebaseError::TokenNotFound { .. } => None,
            FirebaseError::Auth(err) => Some(
                err.server_body()
                    .map(str::to_string)
                    .unwrap_or_else(|| err.to_string()),
            ),
            FirebaseError::Api { body, .. } => Some(body.clone()),
            FirebaseError::NotConfigured(msg) | FirebaseError::Repository(msg) => {
                Some(msg.clone())
            }
            FirebaseError::Request(err) => Some(err.to_string()),
        }
    }
}

impl HttpStatusCode for FirebaseError {
    fn status_code(&self) -> u16 {
        match self {
            FirebaseError::MissingFields(_) => 400,
            FirebaseError::TokenNotFound { .. } => 404,
            _ => 500,
        }
    }
}

impl From<FirebaseError> for BeaconError {
    fn from(err: FirebaseError) -> Self {
        match err {
            FirebaseError::MissingFields(fields) => {
                validation_error(format!("Missing required fields: {fields}"))
            }
            FirebaseError::TokenNotFound { .. } => not_found("FCM token not found for user"),
            FirebaseError::NotConfigured(msg) => config_error(msg),
            FirebaseError::Auth(err) => err.into(),
            FirebaseError::Request(err) => external_service_error("FCM", err),
            FirebaseError::Api { body, .. } => external_service_error("FCM", body),
            FirebaseError::Repository(msg) => internal_error(msg),
        }
    }
}

/// A message to be sent via Firebase Cloud Messaging
///
/// Top-level wrapper of the FCM HTTP v1 request body.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct FcmMessage {
    pub message: Message,
}

/// The message payload for Firebase Cloud Messaging
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Message {
    /// Registration token of the target device
    pub token: String,

    /// The notification shown on the device
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<Notification>,

    /// Custom key-value data delivered to the app. FCM only accepts string values.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub data: HashMap<String, String>,
}

/// The notification to be displayed on the user's device
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Notification {
    pub title: String,
    pub body: String,
}

/// Response from the Firebase Cloud Messaging API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FcmResponse {
    /// `projects/{project_id}/messages/{message_id}`
    pub name: String,
}

/// Where the service account JSON comes from.
#[derive(Clone)]
enum KeySource {
    Inline(String),
    File(String),
    Missing,
}

/// Client for the Firebase Cloud Messaging API
#[derive(Clone)]
pub struct FirebaseClient {
    client: Client,
    issuer: TokenIssuer,
    project_id: Option<String>,
    api_base_url: String,
    key_source: KeySource,
    timeout_secs: u64,
}

impl FirebaseClient {
    /// Creates a client from the `firebase` config section and a token issuer.
    ///
    /// Inline service account JSON wins over `key_path`. Missing settings are
    /// only reported when a message is sent. Requests time out after
    /// [`DEFAULT_TIMEOUT_SECS`], see [`FirebaseClient::with_timeout`].
    pub fn new(config: &FirebaseConfig, issuer: TokenIssuer) -> Result<Self, FirebaseError> {
        // An unresolved "secret_from_env" marker counts as unset.
        let is_set = |v: &&String| !v.trim().is_empty() && v.as_str() != SECRET_MARKER;
        let key_source = match (
            config.service_account_json.as_ref().filter(is_set),
            config.key_path.as_ref().filter(is_set),
        ) {
            (Some(json), _) => KeySource::Inline(json.clone()),
            (None, Some(path)) => KeySource::File(path.clone()),
            (None, None) => KeySource::Missing,
        };

        Ok(Self {
            client: create_client(DEFAULT_TIMEOUT_SECS)?,
            issuer,
            project_id: config.project_id.clone().filter(|p| !p.is_empty()),
            api_base_url: config
                .api_base_url
                .clone()
                .unwrap_or_else(|| FCM_API_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            key_source,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        })
    }

    /// Rebuilds the HTTP client with a request timeout. Zero means the default.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Result<Self, FirebaseError> {
        self.client = create_client(timeout_secs)?;
        self.timeout_secs = if timeout_secs == 0 {
            DEFAULT_TIMEOUT_SECS
        } else {
            timeout_secs
        };
        Ok(self)
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    /// `{api_base_url}/v1/projects/{project_id}/messages:send`
    pub fn send_url(&self) -> Result<String, FirebaseError> {
        let project_id = self.project_id.as_deref().ok_or_else(|| {
            FirebaseError::NotConfigured("Missing project_id in FirebaseConfig".to_string())
        })?;
        Ok(format!(
            "{}/v1/projects/{}/messages:send",
            self.api_base_url, project_id
        ))
    }

    /// Reads the service account key.
    pub async fn load_key(&self) -> Result<ServiceAccountKey, FirebaseError> {
        match &self.key_source {
            KeySource::Inline(json) => Ok(ServiceAccountKey::from_json(json)?),
            KeySource::File(path) => Ok(ServiceAccountKey::from_file(path).await?),
            KeySource::Missing => Err(FirebaseError::NotConfigured(
                "neither firebase.service_account_json nor firebase.key_path is set".to_string(),
            )),
        }
    }

    /// Sends a push notification message via Firebase Cloud Messaging
    ///
    /// # Errors
    ///
    /// * `NotConfigured` if the project id or the service account key is missing
    /// * `Auth` if the bearer token cannot be issued
    /// * `Api` with the verbatim body if FCM answers with a non-success status
    pub async fn send_message(&self, message: &FcmMessage) -> Result<FcmResponse, FirebaseError> {
        let url = self.send_url()?;
        let key = self.load_key().await?;
        let token = self.issuer.issue(&key).await?;

        debug!("Sending FCM message to {}", url);
        let response = self
            .client
            .post(&url)
            .header(header::AUTHORIZATION, token.authorization_header())
            .json(message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            error!("FCM error ({}): {}", status, body);
            return Err(FirebaseError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let fcm_response: FcmResponse = response.json().await?;
        info!("FCM message sent: {}", fcm_response.name);
        Ok(fcm_response)
    }
}
