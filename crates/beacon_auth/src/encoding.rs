//! Encoding helpers shared by the assertion builder and its verifier.
//!
//! Segments are base64url without padding. PEM bodies are standard base64 with
//! the `-----BEGIN/END ...-----` markers and all whitespace removed.

use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    Engine,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::AuthError;

/// Encodes raw bytes as one assertion segment.
pub fn encode_segment<T: AsRef<[u8]> + ?Sized>(bytes: &T) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Serializes `value` to compact JSON and encodes it as one segment.
pub fn encode_json_segment<T: Serialize>(value: &T) -> Result<String, AuthError> {
    let json = serde_json::to_vec(value)
        .map_err(|e| AuthError::SigningFailure(format!("failed to serialize segment: {e}")))?;
    Ok(encode_segment(&json))
}

/// Decodes one segment back to raw bytes.
pub fn decode_segment(segment: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(segment)
}

/// Decodes one segment and parses it as JSON.
pub fn decode_json_segment<T: DeserializeOwned>(segment: &str) -> Result<T, String> {
    let bytes = decode_segment(segment).map_err(|e| format!("invalid base64url segment: {e}"))?;
    serde_json::from_slice(&bytes).map_err(|e| format!("invalid JSON segment: {e}"))
}

/// True when `s` is a non-empty run of base64url characters without padding.
pub fn is_segment(s: &str) -> bool {
    !s.is_empty()
        && s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Removes the PEM armour markers and every whitespace character.
///
/// Markers are removed wherever they appear, so a key flattened onto one line
/// keeps its body.
pub fn strip_pem(pem: &str) -> String {
    pem.split("-----")
        .filter(|part| !(part.starts_with("BEGIN ") || part.starts_with("END ")))
        .flat_map(str::chars)
        .filter(|c| !c.is_whitespace())
        .collect()
}

/// Turns a PEM-wrapped PKCS#8 key into its DER bytes.
///
/// Literal `\n` escapes count as newlines.
pub fn decode_pem_body(pem: &str) -> Result<Vec<u8>, AuthError> {
    let normalized = pem.replace("\\n", "\n");
    let body = strip_pem(&normalized);
    if body.is_empty() {
        return Err(AuthError::MalformedKey(
            "private_key contains no key material".to_string(),
        ));
    }
    STANDARD
        .decode(body.as_bytes())
        .map_err(|e| AuthError::MalformedKey(format!("private_key is not valid base64: {e}")))
}
