//! Data-access configuration and builder

use std::env;

use serde::{Deserialize, Serialize};
use service_builder::builder;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {field}: expected {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },
}

/// Configuration shared by the registry and every collection it creates
#[derive(Debug, Clone, Serialize, Deserialize)]
#[builder]
pub struct DataAccessConfig {
    /// Width of the zero-padded version string
    #[builder(default = "10", getter)]
    pub version_pad_width: usize,

    /// How often a versioned create re-reads latest after losing a race
    #[builder(default = "3", getter)]
    pub version_write_attempts: u32,

    /// Limit applied to `all*` queries that do not set one
    #[builder(default)]
    pub default_query_limit: Option<usize>,

    /// Refuse collections whose has_one/has_many references lack a reciprocal
    #[builder(default = "false")]
    pub strict_references: bool,
}

impl Default for DataAccessConfig {
    fn default() -> Self {
        Self {
            version_pad_width: 10,
            version_write_attempts: 3,
            default_query_limit: None,
            strict_references: false,
        }
    }
}

impl DataAccessConfig {
    /// Load configuration from `DATA_ACCESS_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(width) = env::var("DATA_ACCESS_VERSION_PAD_WIDTH") {
            config.version_pad_width = parse_var("version_pad_width", &width, "positive integer")?;
        }
        if let Ok(attempts) = env::var("DATA_ACCESS_VERSION_WRITE_ATTEMPTS") {
            config.version_write_attempts = parse_var("version_write_attempts", &attempts, "positive integer")?;
        }
        if let Ok(limit) = env::var("DATA_ACCESS_DEFAULT_QUERY_LIMIT") {
            config.default_query_limit = Some(parse_var("default_query_limit", &limit, "positive integer")?);
        }
        if let Ok(strict) = env::var("DATA_ACCESS_STRICT_REFERENCES") {
            config.strict_references = parse_var("strict_references", &strict, "true or false")?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=20).contains(&self.version_pad_width) {
            return Err(invalid(
                "version_pad_width",
                &self.version_pad_width.to_string(),
                "width between 1 and 20",
            ));
        }
        if self.version_write_attempts == 0 {
            return Err(invalid("version_write_attempts", "0", "at least 1 attempt"));
        }
        if self.default_query_limit == Some(0) {
            return Err(invalid("default_query_limit", "0", "positive limit"));
        }
        Ok(())
    }
}

fn invalid(field: &str, value: &str, expected: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        expected: expected.to_string(),
    }
}

fn parse_var<T: std::str::FromStr>(field: &str, value: &str, expected: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| invalid(field, value, expected))
}
