//! Test fixtures for beacon-auth integration tests.
#![allow(dead_code)]

use beacon_auth::{encoding::decode_pem_body, SignedAssertion, JWT_BEARER_GRANT_TYPE};
use rsa::{pkcs8::DecodePrivateKey, RsaPrivateKey, RsaPublicKey};
use serde_json::json;
use std::collections::HashMap;
use wiremock::{Request, Respond, ResponseTemplate};

pub const TEST_KEY_PEM: &str = include_str!("test_service_account_key.pem");
pub const EC_KEY_PEM: &str = include_str!("ec_p256_key.pem");
pub const TEST_EMAIL: &str = "test@svc.example";
pub const TEST_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Service account JSON as downloaded from the cloud console.
pub fn service_account_json(private_key: &str) -> String {
    json!({
        "type": "service_account",
        "project_id": "beacon-test",
        "private_key_id": "0123456789abcdef",
        "private_key": private_key,
        "client_email": TEST_EMAIL,
        "client_id": "100000000000000000001",
        "token_uri": "https://oauth2.googleapis.com/token"
    })
    .to_string()
}

pub fn test_public_key() -> RsaPublicKey {
    let der = decode_pem_body(TEST_KEY_PEM).expect("fixture key is valid base64");
    RsaPrivateKey::from_pkcs8_der(&der)
        .expect("fixture key is PKCS#8 RSA")
        .to_public_key()
}

/// Replaces one character in the middle of `segment` with a different base64url character.
pub fn mutate_one_char(segment: &str) -> String {
    let idx = segment.len() / 2;
    let mut chars: Vec<char> = segment.chars().collect();
    chars[idx] = if chars[idx] == 'A' { 'B' } else { 'A' };
    chars.into_iter().collect()
}

pub fn form_fields(request: &Request) -> HashMap<String, String> {
    serde_urlencoded::from_bytes(&request.body).unwrap_or_default()
}

/// A token endpoint that checks the grant type and the assertion signature.
pub struct VerifyingTokenEndpoint {
    pub public_key: RsaPublicKey,
    pub audience: String,
}

impl Respond for VerifyingTokenEndpoint {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let fields = form_fields(request);
        if fields.get("grant_type").map(String::as_str) != Some(JWT_BEARER_GRANT_TYPE) {
            return ResponseTemplate::new(400)
                .set_body_string(r#"{"error":"unsupported_grant_type"}"#);
        }

        let verified = fields
            .get("assertion")
            .ok_or(())
            .and_then(|a| SignedAssertion::parse(a.clone()).map_err(|_| ()))
            .and_then(|a| a.verify(&self.public_key).map_err(|_| ()));

        match verified {
            Ok(claims) if claims.aud == self.audience && claims.exp > claims.iat => {
                ResponseTemplate::new(200).set_body_json(json!({
                    "access_token": "abc123",
                    "expires_in": 3600,
                    "token_type": "Bearer"
                }))
            }
            _ => ResponseTemplate::new(400).set_body_string(
                r#"{"error":"invalid_grant","error_description":"Invalid JWT Signature."}"#,
            ),
        }
    }
}
