//! Engine configuration, read from TOML.
//!
//! ```toml
//! [diff]
//! default_fields = ["name", "parent"]
//! ignore_groups = false
//!
//! [review]
//! require_rejection_comment = true
//!
//! [logging]
//! level = "debug"
//! ```
//!
//! Every key has a default, so partial files are valid.

use std::path::Path;

use orgsync_diff::DiffConfig;
use orgsync_review::ReviewConfig;
use serde::{Deserialize, Serialize};

use crate::error::SdkResult;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub diff: DiffDefaults,
    pub review: ReviewConfig,
    pub logging: LoggingConfig,
}

/// Defaults applied when a diff is requested without explicit parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffDefaults {
    /// Diff field names; empty compares every field.
    pub default_fields: Vec<String>,
    pub ignore_groups: bool,
}

impl DiffDefaults {
    pub fn to_diff_config(&self) -> SdkResult<DiffConfig> {
        let config = DiffConfig::new().with_field_names(&self.default_fields)?;
        Ok(if self.ignore_groups {
            config.ignoring_groups()
        } else {
            config
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(raw: &str) -> SdkResult<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }
}
