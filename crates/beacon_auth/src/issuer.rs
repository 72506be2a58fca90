//! Build-then-exchange in one call.

use beacon_common::create_client;
use beacon_config::OAuthConfig;
use std::time::Duration;
use tracing::{info, instrument};

use crate::assertion::AssertionBuilder;
use crate::error::AuthError;
use crate::exchange::{BearerToken, TokenExchanger};
use crate::key::ServiceAccountKey;

/// Issues one bearer token per call for a given service account.
///
/// The assertion audience is always the exchanger's token endpoint. Claims are
/// fixed when the assertion is signed, before the single network await.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    builder: AssertionBuilder,
    exchanger: TokenExchanger,
}

impl TokenIssuer {
    pub fn new(exchanger: TokenExchanger, scope: impl Into<String>) -> Self {
        let builder = AssertionBuilder::new(exchanger.token_uri(), scope);
        Self { builder, exchanger }
    }

    /// Wires an issuer from the `oauth` config section.
    pub fn from_config(config: &OAuthConfig) -> Result<Self, AuthError> {
        let client = create_client(config.request_timeout_secs).map_err(|e| {
            AuthError::ExchangeRejected {
                status: None,
                body: format!("failed to build HTTP client: {e}"),
            }
        })?;
        let exchanger = TokenExchanger::with_client(client, &config.token_uri);
        Ok(Self::new(exchanger, &config.scope)
            .with_lifetime(Duration::from_secs(config.assertion_lifetime_secs)))
    }

    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.builder = self.builder.with_lifetime(lifetime);
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.builder = self.builder.with_subject(subject);
        self
    }

    pub fn builder(&self) -> &AssertionBuilder {
        &self.builder
    }

    pub fn exchanger(&self) -> &TokenExchanger {
        &self.exchanger
    }

    /// Signs a fresh assertion for `key` and exchanges it for a bearer token.
    #[instrument(skip_all, fields(iss = %key.client_email))]
    pub async fn issue(&self, key: &ServiceAccountKey) -> Result<BearerToken, AuthError> {
        let assertion = self.builder.build(key)?;
        let token = self.exchanger.exchange(&assertion).await?;
        info!("Issued bearer token for {}", key.client_email);
        Ok(token)
    }

    /// Same as [`TokenIssuer::issue`], starting from the JSON key file contents.
    pub async fn issue_from_json(&self, key_json: &str) -> Result<BearerToken, AuthError> {
        let key = ServiceAccountKey::from_json(key_json)?;
        self.issue(&key).await
    }
}
