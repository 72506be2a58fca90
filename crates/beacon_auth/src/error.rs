// --- File: crates/beacon_auth/src/error.rs ---
use beacon_common::{auth_error, config_error, external_service_error, BeaconError, HttpStatusCode};
use thiserror::Error;

/// Errors raised while issuing a service-account bearer token.
///
/// Every variant is terminal for the call that produced it. Nothing in this
/// crate retries, and no fallback token is ever returned in place of an error.
#[derive(Error, Debug)]
pub enum AuthError {
    /// The service-account key material is unusable: empty input, invalid JSON,
    /// a missing `private_key`/`client_email` field or a PEM body that is not base64.
    #[error("Malformed service account key: {0}")]
    MalformedKey(String),

    /// The crypto primitive rejected the key import or the signature operation.
    #[error("Signing failure: {0}")]
    SigningFailure(String),

    /// The authorization server answered with a non-success status, or could not be
    /// reached at all (`status` is `None` then). `body` is passed through verbatim.
    #[error("Token exchange rejected{}: {body}", status_suffix(.status))]
    ExchangeRejected { status: Option<u16>, body: String },

    /// The authorization server answered with success but the body lacks `access_token`.
    #[error("Malformed token response: {0}")]
    MalformedResponse(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl AuthError {
    /// Name of the step that failed, for diagnostics.
    pub fn step(&self) -> &'static str {
        match self {
            AuthError::MalformedKey(_) => "parse_key",
            AuthError::SigningFailure(_) => "sign_assertion",
            AuthError::ExchangeRejected { .. } => "exchange_assertion",
            AuthError::MalformedResponse(_) => "parse_token_response",
        }
    }

    /// The raw error body returned by the authorization server, if any.
    pub fn server_body(&self) -> Option<&str> {
        match self {
            AuthError::ExchangeRejected { body, .. } => Some(body),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        AuthError::ExchangeRejected {
            status: err.status().map(|s| s.as_u16()),
            body: err.to_string(),
        }
    }
}

/// Convert AuthError to BeaconError
impl From<AuthError> for BeaconError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MalformedKey(msg) => config_error(format!("Service account key: {}", msg)),
            AuthError::SigningFailure(msg) => auth_error(format!("Assertion signing failed: {}", msg)),
            AuthError::ExchangeRejected { body, .. } => {
                external_service_error("OAuth2 token endpoint", body)
            }
            AuthError::MalformedResponse(msg) => {
                external_service_error("OAuth2 token endpoint", format!("malformed response: {}", msg))
            }
        }
    }
}

impl HttpStatusCode for AuthError {
    fn status_code(&self) -> u16 {
        match self {
            AuthError::MalformedKey(_) => 500,
            AuthError::SigningFailure(_) => 500,
            AuthError::ExchangeRejected { .. } => 502,
            AuthError::MalformedResponse(_) => 502,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_rejected_display_includes_status() {
        let err = AuthError::ExchangeRejected {
            status: Some(401),
            body: r#"{"error":"invalid_grant"}"#.to_string(),
        };
        assert_eq!(
            err.to_string(),
            r#"Token exchange rejected (HTTP 401): {"error":"invalid_grant"}"#
        );
        assert_eq!(err.server_body(), Some(r#"{"error":"invalid_grant"}"#));
        assert_eq!(err.step(), "exchange_assertion");
    }

    #[test]
    fn test_exchange_rejected_display_without_status() {
        let err = AuthError::ExchangeRejected {
            status: None,
            body: "connection refused".to_string(),
        };
        assert_eq!(err.to_string(), "Token exchange rejected: connection refused");
    }

    #[test]
    fn test_conversion_keeps_server_body() {
        let err: BeaconError = AuthError::ExchangeRejected {
            status: Some(400),
            body: "invalid_grant".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "External service error: OAuth2 token endpoint - invalid_grant"
        );
        assert_eq!(err.status_code(), 502);
    }

    #[test]
    fn test_only_exchange_errors_carry_a_body() {
        assert!(AuthError::MalformedKey("x".into()).server_body().is_none());
        assert_eq!(AuthError::SigningFailure("x".into()).step(), "sign_assertion");
    }
}
