//! Service-account token issuance for Beacon.
//!
//! Turns a service account's JSON key into a short-lived OAuth2 bearer token:
//!
//! 1. [`AssertionBuilder`] signs an RS256 assertion (`iss`, `scope`, `aud`,
//!    `iat`, `exp = iat + 3600`) with the account's PKCS#8 RSA key.
//! 2. [`TokenExchanger`] posts it to the token endpoint with the JWT-bearer
//!    grant and returns the [`BearerToken`].
//!
//! [`TokenIssuer`] runs both steps. Every call produces a fresh token; nothing
//! is cached, retried or shared between calls.
//!
//! # Example
//!
//! ```rust,no_run
//! use beacon_auth::{ServiceAccountKey, TokenExchanger, TokenIssuer, GOOGLE_TOKEN_URI};
//!
//! async fn token() -> Result<String, beacon_auth::AuthError> {
//!     let key = ServiceAccountKey::from_file("/etc/beacon/service-account.json").await?;
//!     let issuer = TokenIssuer::new(
//!         TokenExchanger::new(GOOGLE_TOKEN_URI),
//!         "https://www.googleapis.com/auth/firebase.messaging",
//!     );
//!     let token = issuer.issue(&key).await?;
//!     Ok(token.authorization_header())
//! }
//! ```

pub mod assertion;
pub mod encoding;
pub mod error;
pub mod exchange;
pub mod issuer;
pub mod key;

pub use assertion::{
    AssertionBuilder, AssertionClaims, AssertionHeader, SignedAssertion,
    DEFAULT_ASSERTION_LIFETIME,
};
pub use error::AuthError;
pub use exchange::{BearerToken, TokenExchanger, GOOGLE_TOKEN_URI, JWT_BEARER_GRANT_TYPE};
pub use issuer::TokenIssuer;
pub use key::ServiceAccountKey;
