// --- File: crates/beacon_common/src/lib.rs ---

pub mod error; // Error handling
pub mod http; // HTTP utilities
pub mod logging; // Logging utilities

// Re-export error types and utilities for easier access
pub use error::{
    auth_error, config_error, external_service_error, internal_error, not_found,
    validation_error, BeaconError, HttpStatusCode,
};

// Re-export HTTP utilities for easier access
pub use http::client::{create_client, DEFAULT_TIMEOUT_SECS};

// Re-export logging utilities for easier access
pub use logging::{init, init_with_level, log_result};
