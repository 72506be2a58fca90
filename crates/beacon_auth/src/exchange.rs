//! OAuth2 JWT-bearer token exchange.
//!
//! Posts a signed assertion to the token endpoint and returns the bearer token
//! from its JSON answer. One request per call; no retry, no cache.

use reqwest::{header, Client};
use serde::Deserialize;
use std::fmt;
use tracing::{debug, error, info};

use crate::assertion::SignedAssertion;
use crate::error::AuthError;

/// Grant type identifier for assertion-based token requests (RFC 7523).
pub const JWT_BEARER_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Google's OAuth2 token endpoint.
pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// A short-lived access token returned by the authorization server.
///
/// Nothing in this crate keeps a copy; the caller owns it until it expires.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct BearerToken {
    pub access_token: String,
    /// Lifetime hint in seconds, as reported by the server.
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl BearerToken {
    /// Value for an `Authorization` header.
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerToken")
            .field("access_token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// Exchanges signed assertions for bearer tokens at one token endpoint.
#[derive(Debug, Clone)]
pub struct TokenExchanger {
    client: Client,
    token_uri: String,
}

impl TokenExchanger {
    pub fn new(token_uri: impl Into<String>) -> Self {
        Self::with_client(Client::new(), token_uri)
    }

    /// Uses a preconfigured client, e.g. one carrying a request timeout.
    pub fn with_client(client: Client, token_uri: impl Into<String>) -> Self {
        Self {
            client,
            token_uri: token_uri.into(),
        }
    }

    pub fn token_uri(&self) -> &str {
        &self.token_uri
    }

    /// Trades `assertion` for a bearer token.
    ///
    /// # Errors
    ///
    /// * `ExchangeRejected` if the endpoint answers with a non-success status
    ///   (the body is kept verbatim) or cannot be reached.
    /// * `MalformedResponse` if a success body is not JSON or lacks `access_token`.
    pub async fn exchange(&self, assertion: &SignedAssertion) -> Result<BearerToken, AuthError> {
        debug!("Exchanging assertion at {}", self.token_uri);

        let response = self
            .client
            .post(&self.token_uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&[
                ("grant_type", JWT_BEARER_GRANT_TYPE),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!("Token exchange error ({}): {}", status, body);
            return Err(AuthError::ExchangeRejected {
                status: Some(status.as_u16()),
                body,
            });
        }

        let token = parse_token_response(&body)?;
        info!(
            expires_in = token.expires_in,
            "Access token obtained successfully"
        );
        Ok(token)
    }
}

/// Parses a token endpoint success body.
pub fn parse_token_response(body: &str) -> Result<BearerToken, AuthError> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| AuthError::MalformedResponse(format!("token response is not JSON: {e}")))?;

    match value.get("access_token") {
        Some(serde_json::Value::String(token)) if !token.is_empty() => {}
        Some(_) => {
            return Err(AuthError::MalformedResponse(
                "access_token is not a non-empty string".to_string(),
            ))
        }
        None => {
            return Err(AuthError::MalformedResponse(
                "access_token missing from token response".to_string(),
            ))
        }
    }

    serde_json::from_value(value)
        .map_err(|e| AuthError::MalformedResponse(format!("invalid token response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_token_response_reads_fields() {
        let token =
            parse_token_response(r#"{"access_token":"abc123","expires_in":3600,"token_type":"Bearer"}"#)
                .unwrap();
        assert_eq!(token.access_token, "abc123");
        assert_eq!(token.expires_in, Some(3600));
        assert_eq!(token.token_type.as_deref(), Some("Bearer"));
        assert_eq!(token.authorization_header(), "Bearer abc123");
    }

    #[test]
    fn test_parse_token_response_without_lifetime_hint() {
        let token = parse_token_response(r#"{"access_token":"abc123"}"#).unwrap();
        assert_eq!(token.expires_in, None);
    }

    #[test]
    fn test_parse_token_response_missing_access_token() {
        let err = parse_token_response(r#"{"id_token":"x","expires_in":3600}"#).unwrap_err();
        assert!(matches!(err, AuthError::MalformedResponse(_)));
    }

    #[test]
    fn test_parse_token_response_not_json() {
        let err = parse_token_response("<html>ok</html>").unwrap_err();
        assert!(matches!(err, AuthError::MalformedResponse(_)));
    }

    #[test]
    fn test_parse_token_response_empty_token() {
        let err = parse_token_response(r#"{"access_token":""}"#).unwrap_err();
        assert!(matches!(err, AuthError::MalformedResponse(_)));
    }

    #[test]
    fn test_bearer_token_debug_is_redacted() {
        let token = parse_token_response(r#"{"access_token":"abc123"}"#).unwrap();
        assert!(!format!("{token:?}").contains("abc123"));
    }
}
