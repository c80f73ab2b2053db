//! Configuration for the migrate tool's record handling.
//!
//! The encryption key itself is loaded through [`fieldseal::Config`]; this
//! covers only which JSON object keys to transform.

use anyhow::{Context, Result};
use serde::Deserialize;

/// Validated migrate-tool configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Comma-separated JSON object keys holding encryptable text.
    #[serde(default = "default_fields")]
    pub fields: String,
}

fn default_fields() -> String {
    "url,title,favicon_url,og_image_url,description".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build migrate configuration")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise migrate configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// The configured field names, trimmed, empties dropped.
    pub fn field_list(&self) -> Vec<String> {
        self.fields
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_owned)
            .collect()
    }

    fn validate(&self) -> Result<()> {
        if self.field_list().is_empty() {
            anyhow::bail!("FIELDS must name at least one JSON object key");
        }
        Ok(())
    }
}
