//! Engine configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tabula_error::ConfigError;
use tracing::{debug, instrument};

/// Tunables of the view engine.
///
/// Loaded from TOML with [`ViewsConfig::from_file`] or from the environment
/// with [`ViewsConfig::from_env`]. Missing keys fall back to defaults.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_builder::Builder,
)]
#[builder(default, setter(into))]
pub struct ViewsConfig {
    /// Largest page served by public link row lookups
    #[serde(default = "default_row_page_size_limit")]
    row_page_size_limit: usize,
    /// Random bytes per public slug
    #[serde(default = "default_slug_bytes")]
    slug_bytes: usize,
    /// Buffered change events per subscriber
    #[serde(default = "default_event_capacity")]
    event_capacity: usize,
}

fn default_row_page_size_limit() -> usize {
    200
}

fn default_slug_bytes() -> usize {
    32
}

fn default_event_capacity() -> usize {
    256
}

impl Default for ViewsConfig {
    fn default() -> Self {
        Self {
            row_page_size_limit: default_row_page_size_limit(),
            slug_bytes: default_slug_bytes(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl ViewsConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, the TOML is invalid or a
    /// value is out of range.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("cannot read config: {}", e)))?;
        Self::from_toml_str(&contents)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)
            .map_err(|e| ConfigError::new(format!("invalid config: {}", e)))?;
        config.validate()?;
        debug!(?config, "Loaded views configuration");
        Ok(config)
    }

    /// Create config from environment variables
    ///
    /// Reads:
    /// - `TABULA_ROW_PAGE_SIZE_LIMIT` (default: 200)
    /// - `TABULA_SLUG_BYTES` (default: 32)
    /// - `TABULA_EVENT_CAPACITY` (default: 256)
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            row_page_size_limit: env_usize("TABULA_ROW_PAGE_SIZE_LIMIT")?
                .unwrap_or_else(default_row_page_size_limit),
            slug_bytes: env_usize("TABULA_SLUG_BYTES")?.unwrap_or_else(default_slug_bytes),
            event_capacity: env_usize("TABULA_EVENT_CAPACITY")?
                .unwrap_or_else(default_event_capacity),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.row_page_size_limit == 0 {
            return Err(ConfigError::new("row_page_size_limit must be positive"));
        }
        if self.slug_bytes < 16 {
            return Err(ConfigError::new("slug_bytes must be at least 16"));
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::new("event_capacity must be positive"));
        }
        Ok(())
    }
}

fn env_usize(name: &str) -> Result<Option<usize>, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|_| ConfigError::new(format!("{} is not a number: '{}'", name, raw))),
        Err(_) => Ok(None),
    }
}
