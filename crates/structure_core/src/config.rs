//! Structure factory configuration.
//!
//! # Invariants
//! - `batch_size` and `count_window` are never zero after `validate()`.
//! - Missing JSON keys fall back to the defaults below.

use crate::access::license::LicenseLevel;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

const DEFAULT_BATCH_SIZE: u32 = 500;
const DEFAULT_COUNT_WINDOW: u32 = 100;
const DEFAULT_FILE_ASSET_VAR: &str = "FileAsset";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactoryConfig {
    pub license_level: LicenseLevel,
    /// Rows fetched per round trip by paginated permission scans.
    pub batch_size: u32,
    /// How many results past the offset a paginated scan must collect.
    pub count_window: u32,
    /// Velocity var name of the default file asset structure.
    pub default_file_asset_var: String,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            license_level: LicenseLevel::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            count_window: DEFAULT_COUNT_WINDOW,
            default_file_asset_var: DEFAULT_FILE_ASSET_VAR.to_string(),
        }
    }
}

impl FactoryConfig {
    pub fn with_license(license_level: LicenseLevel) -> Self {
        Self {
            license_level,
            ..Self::default()
        }
    }

    /// Parses and validates a JSON config document.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be greater than 0"));
        }
        if self.count_window == 0 {
            return Err(ConfigError::Invalid("count_window must be greater than 0"));
        }
        if self.default_file_asset_var.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "default_file_asset_var must not be blank",
            ));
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Parse(serde_json::Error),
    Invalid(&'static str),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid factory config: {err}"),
            Self::Invalid(message) => write!(f, "invalid factory config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}
