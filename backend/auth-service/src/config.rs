/// Configuration management
use actix_middleware::{FailurePolicy, RevocationConfig, MAX_TOMBSTONE_TTL};
use serde::Deserialize;
use std::time::Duration;

use crate::services::SessionConfig;

/// Process configuration, read once from the environment at startup.
#[derive(Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_server_host")]
    pub server_host: String,

    #[serde(default = "default_server_port")]
    pub server_port: u16,

    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// HS256 signing secret. Required.
    pub jwt_secret_key: String,

    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,

    #[serde(default = "default_revocation_ttl_secs")]
    pub revocation_ttl_secs: u64,

    #[serde(default = "default_revocation_timeout_ms")]
    pub revocation_timeout_ms: u64,

    #[serde(default)]
    pub revocation_failure_policy: FailurePolicy,

    #[serde(default)]
    pub revocation_key_prefix: String,

    /// Comma-separated list of allowed origins; `*` allows all.
    #[serde(default = "default_cors_allowed_origins")]
    pub cors_allowed_origins: String,

    #[serde(default)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Env(#[from] envy::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_token_ttl_secs() -> u64 {
    86_400
}

fn default_revocation_ttl_secs() -> u64 {
    86_400
}

fn default_revocation_timeout_ms() -> u64 {
    250
}

fn default_cors_allowed_origins() -> String {
    "http://localhost:3000".to_string()
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars())
    }

    /// Build from explicit key/value pairs (upper-case env names).
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config: Config = envy::from_iter(vars)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret_key.is_empty() {
            return Err(ConfigError::Invalid("JWT_SECRET_KEY must be set".into()));
        }
        if self.token_ttl_secs == 0 {
            return Err(ConfigError::Invalid("TOKEN_TTL_SECS must be positive".into()));
        }
        if self.revocation_ttl_secs == 0 {
            return Err(ConfigError::Invalid(
                "REVOCATION_TTL_SECS must be positive".into(),
            ));
        }
        let max_ttl_secs = MAX_TOMBSTONE_TTL.as_secs();
        for (name, value) in [
            ("TOKEN_TTL_SECS", self.token_ttl_secs),
            ("REVOCATION_TTL_SECS", self.revocation_ttl_secs),
        ] {
            if value > max_ttl_secs {
                return Err(ConfigError::Invalid(format!(
                    "{} must not exceed {} seconds",
                    name, max_ttl_secs
                )));
            }
        }
        if self.revocation_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "REVOCATION_TIMEOUT_MS must be positive".into(),
            ));
        }

        if self.token_ttl_secs > self.revocation_ttl_secs {
            tracing::warn!(
                token_ttl_secs = self.token_ttl_secs,
                revocation_ttl_secs = self.revocation_ttl_secs,
                "Token lifetime exceeds revocation TTL; logout tombstones are extended to each token's remaining lifetime"
            );
        }

        Ok(())
    }

    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            token_ttl: Duration::from_secs(self.token_ttl_secs),
            revocation_ttl: Duration::from_secs(self.revocation_ttl_secs),
        }
    }

    pub fn revocation(&self) -> RevocationConfig {
        RevocationConfig {
            policy: self.revocation_failure_policy,
            timeout: Duration::from_millis(self.revocation_timeout_ms),
            key_prefix: self.revocation_key_prefix.clone(),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .field("redis_url", &self.redis_url)
            .field("jwt_secret_key", &"<redacted>")
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("revocation_ttl_secs", &self.revocation_ttl_secs)
            .field("revocation_timeout_ms", &self.revocation_timeout_ms)
            .field("revocation_failure_policy", &self.revocation_failure_policy)
            .field("revocation_key_prefix", &self.revocation_key_prefix)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("log_format", &self.log_format)
            .finish()
    }
}
