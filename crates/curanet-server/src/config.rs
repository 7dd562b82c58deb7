//! Layered server configuration.
//!
//! Sources, later ones winning:
//! 1. built-in defaults
//! 2. `curanet.toml` in the working directory, or the file named by `CURANET_CONFIG`
//! 3. environment variables such as `CURANET__SERVER__PORT=8080`

use config::{Config, ConfigError, Environment, File};
use curanet_core::auth::MIN_BCRYPT_COST;
use curanet_core::PortalSettings;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_PATH_VAR: &str = "CURANET_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "curanet.toml";
pub const ENV_PREFIX: &str = "CURANET";

/// Shortest accepted HS256 signing secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub path: PathBuf,
}

#[derive(Clone, Deserialize)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub session_ttl_hours: i64,
    pub bcrypt_cost: u32,
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("jwt_secret", &"<redacted>")
            .field("session_ttl_hours", &self.session_ttl_hours)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// `tracing_subscriber::EnvFilter` directive, e.g. `info` or `curanet_core=debug`
    pub level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub logging: LoggingSettings,
}

impl Settings {
    /// Load from the default locations and the process environment.
    pub fn load() -> Result<Self, SettingsError> {
        let file = std::env::var_os(CONFIG_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::from_file(&file)
    }

    /// Load with an explicit (optional) config file plus the environment.
    pub fn from_file(file: &Path) -> Result<Self, SettingsError> {
        let settings: Settings = Self::builder()?
            .add_source(File::from(file).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("database.path", "curanet.db")?
            .set_default("auth.jwt_secret", "")?
            .set_default("auth.session_ttl_hours", 24)?
            .set_default("auth.bcrypt_cost", MIN_BCRYPT_COST as i64)?
            .set_default("logging.level", "info")
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.auth.jwt_secret.len() < MIN_SECRET_LEN {
            return Err(SettingsError::Invalid(format!(
                "auth.jwt_secret must be at least {} bytes",
                MIN_SECRET_LEN
            )));
        }
        if self.auth.session_ttl_hours <= 0 {
            return Err(SettingsError::Invalid(
                "auth.session_ttl_hours must be positive".into(),
            ));
        }
        if self.auth.bcrypt_cost < MIN_BCRYPT_COST || self.auth.bcrypt_cost > 31 {
            return Err(SettingsError::Invalid(format!(
                "auth.bcrypt_cost must be between {} and 31",
                MIN_BCRYPT_COST
            )));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn portal_settings(&self) -> PortalSettings {
        PortalSettings {
            jwt_secret: self.auth.jwt_secret.clone().into_bytes(),
            session_ttl: chrono::Duration::hours(self.auth.session_ttl_hours),
            bcrypt_cost: self.auth.bcrypt_cost,
        }
    }
}
