//! Environment variable naming for Beacon.
//!
//! Plain settings use `BEACON__SECTION__KEY` and are picked up by the `config`
//! crate directly. Secrets are written as `"secret_from_env"` in config files
//! and resolved here from `BEACON_SECRET_SECTION_KEY`, falling back to the
//! shorter `SECTION_KEY` form.

use serde_json::Value;
use std::env;
use tracing::warn;

/// The prefix for configuration environment variables
pub const DEFAULT_PREFIX: &str = "BEACON";

/// The prefix for secret environment variables
pub const SECRET_PREFIX: &str = "BEACON_SECRET";

/// The separator for configuration environment variables
pub const CONFIG_SEPARATOR: &str = "__";

/// The separator for secret environment variables
pub const SECRET_SEPARATOR: &str = "_";

/// Placeholder value that marks a setting as a secret to read from the environment.
pub const SECRET_MARKER: &str = "secret_from_env";

/// `"server.port"` → `"BEACON__SERVER__PORT"`
pub fn config_path_to_env_var(path: &str) -> String {
    let path = path.replace('.', CONFIG_SEPARATOR);
    format!("{}{}{}", DEFAULT_PREFIX, CONFIG_SEPARATOR, path).to_uppercase()
}

/// `"firebase.service_account_json"` → `"BEACON_SECRET_FIREBASE_SERVICE_ACCOUNT_JSON"`
pub fn secret_path_to_env_var(path: &str) -> String {
    let path = path.replace('.', SECRET_SEPARATOR);
    format!("{}{}{}", SECRET_PREFIX, SECRET_SEPARATOR, path).to_uppercase()
}

/// `"firebase.service_account_json"` → `"FIREBASE_SERVICE_ACCOUNT_JSON"`
pub fn legacy_secret_path_to_env_var(path: &str) -> String {
    path.replace('.', SECRET_SEPARATOR).to_uppercase()
}

/// Reads a secret, trying the prefixed name before the legacy one.
pub fn get_secret_env_var(path: &str) -> Option<String> {
    env::var(secret_path_to_env_var(path))
        .or_else(|_| env::var(legacy_secret_path_to_env_var(path)))
        .ok()
}

/// Reads a plain setting.
pub fn get_config_env_var(path: &str) -> Option<String> {
    env::var(config_path_to_env_var(path)).ok()
}

pub const SECRET_FIELDS: [&str; 5] = ["secret", "key", "password", "token", "service_account_json"];

/// A path is secret when its last segment is one of [`SECRET_FIELDS`] or ends
/// in `_<field>`, e.g. `private_key` or `api_secret`. `oauth.token_uri` is not.
pub fn is_secret_path(path: &str) -> bool {
    let field = path.rsplit('.').next().unwrap_or(path).to_lowercase();
    SECRET_FIELDS
        .iter()
        .any(|name| field == *name || field.ends_with(&format!("_{name}")))
}

pub fn get_env_var(path: &str) -> Option<String> {
    if is_secret_path(path) {
        get_secret_env_var(path)
    } else {
        get_config_env_var(path)
    }
}

/// Replaces every `"secret_from_env"` string in `value` with its environment value.
///
/// Markers without a matching variable are left in place and logged. Returns
/// `true` if anything was replaced.
pub fn inject_env_vars(value: &mut Value) -> bool {
    fn walk(path: &mut Vec<String>, obj: &mut Value) -> bool {
        match obj {
            Value::Object(map) => {
                let mut replaced = false;
                for (k, v) in map.iter_mut() {
                    path.push(k.clone());
                    replaced |= walk(path, v);
                    path.pop();
                }
                replaced
            }
            Value::String(s) if s == SECRET_MARKER => {
                let path_str = path.join(".");
                match get_env_var(&path_str) {
                    Some(env_val) => {
                        *s = env_val;
                        true
                    }
                    None => {
                        warn!("env var for {} not found", path_str);
                        false
                    }
                }
            }
            _ => false,
        }
    }

    walk(&mut Vec::new(), value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_config_path_to_env_var() {
        assert_eq!(config_path_to_env_var("server.host"), "BEACON__SERVER__HOST");
        assert_eq!(
            config_path_to_env_var("oauth.token_uri"),
            "BEACON__OAUTH__TOKEN_URI"
        );
    }

    #[test]
    fn test_secret_path_to_env_var() {
        assert_eq!(
            secret_path_to_env_var("firebase.service_account_json"),
            "BEACON_SECRET_FIREBASE_SERVICE_ACCOUNT_JSON"
        );
        assert_eq!(
            legacy_secret_path_to_env_var("firebase.service_account_json"),
            "FIREBASE_SERVICE_ACCOUNT_JSON"
        );
    }

    #[test]
    fn test_is_secret_path() {
        assert!(is_secret_path("firebase.service_account_json"));
        assert!(is_secret_path("firebase.private_key"));
        assert!(is_secret_path("relay.api_secret"));
        assert!(is_secret_path("oauth.access_token"));
        assert!(!is_secret_path("oauth.token_uri"));
        assert!(!is_secret_path("firebase.key_path"));
        assert!(!is_secret_path("keystore.path"));
        assert!(!is_secret_path("server.host"));
        assert!(!is_secret_path("firebase.project_id"));
    }

    #[test]
    fn test_inject_env_vars_replaces_marker() {
        env::set_var(
            "BEACON_SECRET_TESTSECTION_SERVICE_ACCOUNT_JSON",
            r#"{"client_email":"a@b"}"#,
        );
        let mut value = json!({
            "testsection": {
                "service_account_json": "secret_from_env",
                "project_id": "beacon-test"
            }
        });
        assert!(inject_env_vars(&mut value));
        assert_eq!(
            value["testsection"]["service_account_json"],
            r#"{"client_email":"a@b"}"#
        );
        assert_eq!(value["testsection"]["project_id"], "beacon-test");
        env::remove_var("BEACON_SECRET_TESTSECTION_SERVICE_ACCOUNT_JSON");
    }

    #[test]
    fn test_token_uri_marker_reads_plain_setting() {
        env::set_var("BEACON__URISECTION__TOKEN_URI", "http://localhost:9000/token");
        env::set_var("BEACON_SECRET_URISECTION_TOKEN_URI", "wrong");
        let mut value = json!({"urisection": {"token_uri": "secret_from_env"}});
        assert!(inject_env_vars(&mut value));
        assert_eq!(value["urisection"]["token_uri"], "http://localhost:9000/token");
        env::remove_var("BEACON__URISECTION__TOKEN_URI");
        env::remove_var("BEACON_SECRET_URISECTION_TOKEN_URI");
    }

    #[test]
    fn test_inject_env_vars_keeps_marker_when_unset() {
        let mut value = json!({"unsetsection": {"api_secret": "secret_from_env"}});
        assert!(!inject_env_vars(&mut value));
        assert_eq!(value["unsetsection"]["api_secret"], "secret_from_env");
    }
}
