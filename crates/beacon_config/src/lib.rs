//! Configuration loading for Beacon.
//!
//! Sources, later ones winning:
//!
//! 1. `config/default.toml`
//! 2. `config/{RUN_ENV}.toml` (`RUN_ENV` defaults to `debug`)
//! 3. environment variables prefixed `BEACON__`, e.g. `BEACON__SERVER__PORT=9000`
//!
//! The config directory is `BEACON_CONFIG_DIR` or `./config`. A `.env` file is
//! loaded once before anything else. String values equal to `secret_from_env`
//! are then replaced from the environment, see [`env_vars`].

use config::{Config, ConfigError, Environment, File};
use once_cell::sync::OnceCell;
use std::env;
use std::path::PathBuf;

pub mod env_vars;
pub mod models;

pub use models::*;

static INIT_DOTENV: OnceCell<()> = OnceCell::new();

/// Loads `.env` (or the file named by `DOTENV_OVERRIDE`) once per process.
///
/// Returns the path that was used.
pub fn ensure_dotenv_loaded() -> String {
    let dotenv_path = env::var("DOTENV_OVERRIDE").unwrap_or_else(|_| ".env".to_string());

    INIT_DOTENV.get_or_init(|| {
        dotenv::from_filename(&dotenv_path).ok();
    });

    dotenv_path
}

fn config_dir() -> PathBuf {
    env::var("BEACON_CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config"))
}

/// Loads the application configuration from files and the environment.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    ensure_dotenv_loaded();

    let run_env = env::var("RUN_ENV").unwrap_or_else(|_| "debug".to_string());
    let dir = config_dir();

    let builder = Config::builder()
        .add_source(File::from(dir.join("default")).required(false))
        .add_source(File::from(dir.join(&run_env)).required(false))
        .add_source(
            Environment::with_prefix(env_vars::DEFAULT_PREFIX)
                .prefix_separator(env_vars::CONFIG_SEPARATOR)
                .separator(env_vars::CONFIG_SEPARATOR),
        );

    tracing::debug!(config_dir = %dir.display(), run_env = %run_env, "Loading configuration");

    let raw: AppConfig = builder.build()?.try_deserialize()?;
    apply_env_overrides_from_marker(raw)
}

/// Replaces `secret_from_env` markers in `config` with environment values.
pub fn apply_env_overrides_from_marker(config: AppConfig) -> Result<AppConfig, ConfigError> {
    let mut json = serde_json::to_value(&config)
        .map_err(|err| ConfigError::Message(format!("failed to serialize config: {err}")))?;
    env_vars::inject_env_vars(&mut json);
    serde_json::from_value(json)
        .map_err(|err| ConfigError::Message(format!("failed to rebuild config: {err}")))
}

/// Parses configuration from a TOML string, without touching the environment.
pub fn config_from_toml(toml: &str) -> Result<AppConfig, ConfigError> {
    Config::builder()
        .add_source(File::from_str(toml, config::FileFormat::Toml))
        .build()?
        .try_deserialize()
}
