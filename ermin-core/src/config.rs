use crate::error::{ConfigError, ErminResult};
use crate::types::Severity;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_sentinel() -> String {
    "NULL".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// How strictly values are judged
    #[serde(default)]
    pub strictness: StrictnessConfig,
    /// What autofix is allowed to change
    #[serde(default)]
    pub repair: RepairConfig,
}

/// Handling of blank cells in optional fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionalMissing {
    #[default]
    Ignore,
    Warning,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrictnessConfig {
    #[serde(default)]
    pub optional_missing: OptionalMissing,
    /// Accept allowed values that differ only in case (reported as warnings)
    #[serde(default)]
    pub case_insensitive_values: bool,
    /// Report input columns the spec does not describe
    #[serde(default)]
    pub report_extra_columns: bool,
    /// Cells holding exactly the sentinel pass without further checks.
    /// Off by default: the sentinel is only valid where the syntax lists it.
    #[serde(default)]
    pub accept_sentinel: bool,
}

impl StrictnessConfig {
    pub fn optional_missing_severity(&self) -> Option<Severity> {
        match self.optional_missing {
            OptionalMissing::Ignore => None,
            OptionalMissing::Warning => Some(Severity::Warning),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairConfig {
    /// Marker written into repaired missing cells
    #[serde(default = "default_sentinel")]
    pub sentinel: String,
    /// Prefer a field's spec `Default` over the sentinel when filling
    #[serde(default = "default_true")]
    pub use_field_defaults: bool,
    /// Append absent required columns, filled like missing cells
    #[serde(default = "default_true")]
    pub add_missing_columns: bool,
    /// Also collapse whitespace and apply case suggestions
    #[serde(default)]
    pub normalize_values: bool,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            sentinel: default_sentinel(),
            use_field_defaults: true,
            add_missing_columns: true,
            normalize_values: false,
        }
    }
}

impl ValidationConfig {
    /// Load config from a YAML file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `path` when one is given, else the defaults. An explicit file
    /// that cannot be read or parsed is fatal.
    pub fn load_optional(path: Option<&Path>) -> ErminResult<Self> {
        match path {
            Some(p) => {
                let config = Self::load_from_file(p)?;
                tracing::debug!(path = %p.display(), "loaded config");
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}
