// --- File: crates/beacon_common/src/error.rs ---
use std::fmt;
use thiserror::Error;

/// The base error type shared by all Beacon crates.
///
/// Each crate converts its own error enum into this one with a
/// `From<SpecificError> for BeaconError` impl.
#[derive(Error, Debug)]
pub enum BeaconError {
    /// Error occurred during an HTTP request
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Error occurred while parsing data
    #[error("Failed to parse data: {0}")]
    ParseError(String),

    /// Error occurred due to missing or invalid configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Error occurred while obtaining or presenting credentials
    #[error("Authentication error: {0}")]
    AuthError(String),

    /// Error occurred during validation
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Error occurred during external service call
    #[error("External service error: {service_name} - {message}")]
    ExternalServiceError {
        service_name: String,
        message: String,
    },

    /// Error occurred due to a resource not being found
    #[error("Not found: {0}")]
    NotFoundError(String),

    /// Error occurred due to an internal error
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// A trait for converting errors to HTTP status codes.
pub trait HttpStatusCode {
    /// Returns the HTTP status code for this error.
    fn status_code(&self) -> u16;
}

impl HttpStatusCode for BeaconError {
    fn status_code(&self) -> u16 {
        match self {
            BeaconError::HttpError(_) => 500,
            BeaconError::ParseError(_) => 400,
            BeaconError::ConfigError(_) => 500,
            BeaconError::AuthError(_) => 500,
            BeaconError::ValidationError(_) => 400,
            BeaconError::ExternalServiceError { .. } => 502,
            BeaconError::NotFoundError(_) => 404,
            BeaconError::InternalError(_) => 500,
        }
    }
}

// Common error conversions
impl From<reqwest::Error> for BeaconError {
    fn from(err: reqwest::Error) -> Self {
        BeaconError::HttpError(err.to_string())
    }
}

impl From<serde_json::Error> for BeaconError {
    fn from(err: serde_json::Error) -> Self {
        BeaconError::ParseError(err.to_string())
    }
}

impl From<std::io::Error> for BeaconError {
    fn from(err: std::io::Error) -> Self {
        BeaconError::InternalError(err.to_string())
    }
}

// Utility functions for error handling
pub fn config_error<T: fmt::Display>(message: T) -> BeaconError {
    BeaconError::ConfigError(message.to_string())
}

pub fn auth_error<T: fmt::Display>(message: T) -> BeaconError {
    BeaconError::AuthError(message.to_string())
}

pub fn validation_error<T: fmt::Display>(message: T) -> BeaconError {
    BeaconError::ValidationError(message.to_string())
}

pub fn not_found<T: fmt::Display>(message: T) -> BeaconError {
    BeaconError::NotFoundError(message.to_string())
}

pub fn external_service_error<T: fmt::Display>(service_name: &str, message: T) -> BeaconError {
    BeaconError::ExternalServiceError {
        service_name: service_name.to_string(),
        message: message.to_string(),
    }
}

pub fn internal_error<T: fmt::Display>(message: T) -> BeaconError {
    BeaconError::InternalError(message.to_string())
}
