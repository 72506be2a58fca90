// --- File: crates/beacon_config/src/models.rs ---

use serde::{Deserialize, Serialize};

// --- General Server Config ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8086,
        }
    }
}

// --- Database Config ---
// Device tokens and notification logs; in-memory when unset.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub url: String, // e.g. "sqlite://data/beacon.db", via BEACON__DATABASE__URL
}

// --- OAuth2 token issuance ---
// Values are handed to the token issuer explicitly; nothing reads them globally.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OAuthConfig {
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default = "default_scope")]
    pub scope: String,
    #[serde(default = "default_assertion_lifetime_secs")]
    pub assertion_lifetime_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

fn default_scope() -> String {
    "https://www.googleapis.com/auth/cloud-platform".to_string()
}

fn default_assertion_lifetime_secs() -> u64 {
    3600
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            token_uri: default_token_uri(),
            scope: default_scope(),
            assertion_lifetime_secs: default_assertion_lifetime_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

// --- Firebase Cloud Messaging Config ---
// The service account JSON is a secret: either a file path or the JSON itself
// via "secret_from_env" (BEACON_SECRET_FIREBASE_SERVICE_ACCOUNT_JSON).
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Deserialize, Serialize, Clone, Default)]
pub struct FirebaseConfig {
    pub project_id: Option<String>,
    pub key_path: Option<String>,
    pub service_account_json: Option<String>,
    /// Overrides https://fcm.googleapis.com, used by tests.
    pub api_base_url: Option<String>,
}

impl std::fmt::Debug for FirebaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseConfig")
            .field("project_id", &self.project_id)
            .field("key_path", &self.key_path)
            .field(
                "service_account_json",
                &self.service_account_json.as_ref().map(|_| "<redacted>"),
            )
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

// --- Unified App Configuration ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    // --- Runtime Flags (optional in config file, default to false) ---
    #[serde(default)]
    pub use_firebase: bool,

    #[serde(default)]
    pub oauth: OAuthConfig,
    #[serde(default)]
    pub firebase: Option<FirebaseConfig>,
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
}
