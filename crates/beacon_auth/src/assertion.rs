//! Signed service-account assertions (RS256 JWTs).
//!
//! An assertion is three base64url segments joined by `.`: the header, the
//! claims and a PKCS#1 v1.5 / SHA-256 signature over the ASCII bytes of
//! `header + "." + claims`. The signature always covers the exact encoded
//! segments, never a re-serialized payload.

use chrono::Utc;
use rsa::{
    pkcs1v15::{Signature, SigningKey, VerifyingKey},
    pkcs8::DecodePrivateKey,
    signature::{SignatureEncoding, Signer, Verifier},
    RsaPrivateKey, RsaPublicKey,
};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use std::time::Duration;
use tracing::debug;

use crate::encoding::{
    decode_json_segment, decode_pem_body, decode_segment, encode_json_segment, encode_segment,
    is_segment,
};
use crate::error::AuthError;
use crate::key::ServiceAccountKey;

/// Validity window of an assertion unless configured otherwise.
pub const DEFAULT_ASSERTION_LIFETIME: Duration = Duration::from_secs(3600);

pub const ASSERTION_ALGORITHM: &str = "RS256";
pub const ASSERTION_TYPE: &str = "JWT";

/// The JOSE header. Constant for every assertion this crate produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionHeader {
    pub alg: String,
    pub typ: String,
}

impl Default for AssertionHeader {
    fn default() -> Self {
        Self {
            alg: ASSERTION_ALGORITHM.to_string(),
            typ: ASSERTION_TYPE.to_string(),
        }
    }
}

/// Claims presented to the authorization server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
    /// Service account email.
    pub iss: String,
    /// Space-separated scopes requested for the bearer token.
    pub scope: String,
    /// Token endpoint the assertion is addressed to.
    pub aud: String,
    /// Issued-at, unix seconds.
    pub iat: i64,
    /// Expiry, unix seconds. Always greater than `iat`.
    pub exp: i64,
    /// User to impersonate under domain-wide delegation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
}

/// A complete, signed assertion.
///
/// Only [`AssertionBuilder`] and [`SignedAssertion::parse`] create values of
/// this type, so holding one means the three-segment format has been checked.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedAssertion(String);

impl SignedAssertion {
    /// Checks that `value` is three non-empty base64url segments joined by `.`.
    ///
    /// A received assertion that cannot be read fails like one whose
    /// signature does not check out: [`AuthError::SigningFailure`].
    pub fn parse(value: impl Into<String>) -> Result<Self, AuthError> {
        let value = value.into();
        let segments: Vec<&str> = value.split('.').collect();
        if segments.len() != 3 || !segments.iter().all(|s| is_segment(s)) {
            return Err(AuthError::SigningFailure(
                "assertion must be three base64url segments separated by '.'".to_string(),
            ));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// `encoded-header.encoded-claims`, the exact bytes the signature covers.
    pub fn signing_input(&self) -> &str {
        match self.0.rfind('.') {
            Some(idx) => &self.0[..idx],
            None => &self.0,
        }
    }

    pub fn signature_segment(&self) -> &str {
        match self.0.rfind('.') {
            Some(idx) => &self.0[idx + 1..],
            None => "",
        }
    }

    fn segment(&self, index: usize) -> &str {
        self.0.split('.').nth(index).unwrap_or_default()
    }

    /// Decodes the header segment.
    pub fn header(&self) -> Result<AssertionHeader, AuthError> {
        decode_json_segment(self.segment(0))
            .map_err(|e| AuthError::SigningFailure(format!("unreadable assertion header: {e}")))
    }

    /// Decodes the claims segment.
    pub fn claims(&self) -> Result<AssertionClaims, AuthError> {
        decode_json_segment(self.segment(1))
            .map_err(|e| AuthError::SigningFailure(format!("unreadable assertion claims: {e}")))
    }

    /// Verifies the RS256 signature with `public_key` and returns the claims.
    ///
    /// Expiry is not checked; that is the authorization server's call.
    pub fn verify(&self, public_key: &RsaPublicKey) -> Result<AssertionClaims, AuthError> {
        let signature_bytes = decode_segment(self.signature_segment())
            .map_err(|e| AuthError::SigningFailure(format!("invalid signature encoding: {e}")))?;
        let signature = Signature::try_from(signature_bytes.as_slice())
            .map_err(|e| AuthError::SigningFailure(format!("invalid signature: {e}")))?;

        VerifyingKey::<Sha256>::new(public_key.clone())
            .verify(self.signing_input().as_bytes(), &signature)
            .map_err(|e| AuthError::SigningFailure(format!("signature mismatch: {e}")))?;

        let header = self.header()?;
        if header.alg != ASSERTION_ALGORITHM {
            return Err(AuthError::SigningFailure(format!(
                "unsupported algorithm {}",
                header.alg
            )));
        }
        self.claims()
    }
}

impl fmt::Display for SignedAssertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// The assertion is a credential in its own right until it expires.
impl fmt::Debug for SignedAssertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignedAssertion({} bytes)", self.0.len())
    }
}

impl AsRef<str> for SignedAssertion {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Builds and signs assertions for one audience and scope.
///
/// The builder holds no key material, so one instance can serve any number
/// of service accounts concurrently.
#[derive(Debug, Clone)]
pub struct AssertionBuilder {
    audience: String,
    scope: String,
    lifetime: Duration,
    subject: Option<String>,
}

impl AssertionBuilder {
    /// `audience` must be the token endpoint the assertion will be posted to.
    pub fn new(audience: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            audience: audience.into(),
            scope: scope.into(),
            lifetime: DEFAULT_ASSERTION_LIFETIME,
            subject: None,
        }
    }

    /// Overrides the validity window. A zero lifetime falls back to the default.
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = if lifetime.as_secs() == 0 {
            DEFAULT_ASSERTION_LIFETIME
        } else {
            lifetime
        };
        self
    }

    /// Sets the `sub` claim for domain-wide delegation.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Claims for `key` issued at `issued_at` (unix seconds).
    pub fn claims_at(&self, key: &ServiceAccountKey, issued_at: i64) -> AssertionClaims {
        let lifetime = i64::try_from(self.lifetime.as_secs()).unwrap_or(i64::MAX);
        AssertionClaims {
            iss: key.client_email.clone(),
            scope: self.scope.clone(),
            aud: self.audience.clone(),
            iat: issued_at,
            exp: issued_at.saturating_add(lifetime),
            sub: self.subject.clone(),
        }
    }

    /// Signs an assertion for `key`, issued now.
    pub fn build(&self, key: &ServiceAccountKey) -> Result<SignedAssertion, AuthError> {
        self.build_at(key, Utc::now().timestamp())
    }

    /// Parses a JSON key file and signs an assertion for it, issued now.
    pub fn build_from_json(&self, key_json: &str) -> Result<SignedAssertion, AuthError> {
        let key = ServiceAccountKey::from_json(key_json)?;
        self.build(&key)
    }

    /// Signs an assertion for `key` with a caller-captured issue time.
    ///
    /// The same key, builder and `issued_at` always yield the same header and
    /// claims segments.
    pub fn build_at(
        &self,
        key: &ServiceAccountKey,
        issued_at: i64,
    ) -> Result<SignedAssertion, AuthError> {
        if key.client_email.trim().is_empty() {
            return Err(AuthError::MalformedKey(
                "client_email not found in service account".to_string(),
            ));
        }
        if key.private_key.trim().is_empty() {
            return Err(AuthError::MalformedKey(
                "private_key not found in service account".to_string(),
            ));
        }

        let der = decode_pem_body(&key.private_key)?;
        let signing_key = import_signing_key(&der)?;

        let claims = self.claims_at(key, issued_at);
        let encoded_header = encode_json_segment(&AssertionHeader::default())?;
        let encoded_claims = encode_json_segment(&claims)?;
        let signing_input = format!("{encoded_header}.{encoded_claims}");

        let signature = signing_key
            .try_sign(signing_input.as_bytes())
            .map_err(|e| AuthError::SigningFailure(format!("signature operation failed: {e}")))?;

        debug!(
            iss = %claims.iss,
            key_id = key.private_key_id.as_deref().unwrap_or("-"),
            exp = claims.exp,
            "Signed service account assertion"
        );

        Ok(SignedAssertion(format!(
            "{signing_input}.{}",
            encode_segment(&signature.to_bytes())
        )))
    }
}

/// Imports PKCS#8 DER bytes as an RSA key usable only for PKCS#1 v1.5 / SHA-256 signing.
fn import_signing_key(der: &[u8]) -> Result<SigningKey<Sha256>, AuthError> {
    let private_key = RsaPrivateKey::from_pkcs8_der(der)
        .map_err(|e| AuthError::SigningFailure(format!("failed to import RSA private key: {e}")))?;
    Ok(SigningKey::<Sha256>::new(private_key))
}
