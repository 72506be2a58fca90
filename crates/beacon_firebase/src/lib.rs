//! Push notifications through Firebase Cloud Messaging for Beacon
//!
//! Looks up the recipient's latest device token, fills in a default title and
//! body for the notification type, sends the message through the FCM HTTP v1
//! API with a freshly issued bearer token, and records a log row.
//!
//! Tokens and logs live in SQLite when `[database] url` is set, in memory
//! otherwise.
//!
//! To enable OpenAPI documentation:
//!
//! ```toml
//! [dependencies]
//! beacon-firebase = { version = "0.1.0", features = ["openapi"] }
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use beacon_config::AppConfig;
//! use beacon_firebase::{routes, FirebaseServiceFactory};
//! use std::sync::Arc;
//!
//! async fn setup_app() -> Result<axum::Router, beacon_firebase::client::FirebaseError> {
//!     let config = Arc::new(AppConfig::default());
//!     let service = FirebaseServiceFactory::new(config).notification_service().await?;
//!     Ok(routes(Arc::new(service)))
//! }
//! ```
//!
//! # API Endpoints
//!
//! - `POST /send-notification` - Send a push notification to a user's device
//! - `POST /register-device` - Register or refresh a device token

pub mod client;
#[cfg(feature = "openapi")]
pub mod doc;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod repository_sql;
pub mod routes;
pub mod service;

pub use routes::routes;
pub use service::{FirebaseServiceFactory, NotificationService};

#[cfg(feature = "openapi")]
pub mod openapi {
    pub use crate::doc::FirebaseApiDoc;
}
