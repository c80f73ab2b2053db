//! Configuration loading and validation for the encryption layer.
//!
//! All values are read from environment variables at startup. Loading fails
//! with a clear error if the key is missing or empty — the process must not
//! become ready without one.

use serde::Deserialize;
use thiserror::Error;

/// Errors raised while loading [`Config`] from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The environment source could not be read or deserialised
    /// (typically: `ENCRYPTION_KEY` is not set at all).
    #[error("failed to read configuration from environment: {0}")]
    Environment(#[from] config::ConfigError),

    /// `ENCRYPTION_KEY` is set but blank.
    #[error("ENCRYPTION_KEY is required and must not be empty")]
    MissingKey,
}

/// Validated encryption-layer configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base64-encoded 256-bit symmetric key. **Required.**
    pub encryption_key: String,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `ENCRYPTION_KEY` is absent or blank.
    pub fn from_env() -> Result<Self, ConfigError> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()?;

        let c: Config = cfg.try_deserialize()?;
        c.validate()?;
        Ok(c)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.encryption_key.trim().is_empty() {
            return Err(ConfigError::MissingKey);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        assert_eq!(default_log_level(), "info");
    }

    #[test]
    fn validate_rejects_empty_key() {
        let cfg = Config {
            encryption_key: "".into(),
            log_level: default_log_level(),
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_blank_key() {
        let cfg = Config {
            encryption_key: "   ".into(),
            log_level: default_log_level(),
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_accepts_valid_config() {
        let cfg = Config {
            encryption_key: "c2VjcmV0".into(),
            log_level: "debug".into(),
        };
        assert!(cfg.validate().is_ok());
    }
}
