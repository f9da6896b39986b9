//! # Configuration
//!
//! Tuning knobs for a left-right map, loaded once from TOML.
//!
//! ```toml
//! initial_capacity = 4096
//! stall_warn_yields = 100000
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{LeftRightError, LeftRightResult};

/// Yields a single drain may spend before a stall warning is logged.
pub const DEFAULT_STALL_WARN_YIELDS: u64 = 100_000;

/// Configuration for [`crate::with_config`].
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LeftRightConfig {
    /// Entries pre-allocated in each of the two slots.
    pub initial_capacity: usize,
    /// Yields in one drain before `publish` logs a warning naming the
    /// readers it is waiting on. The drain keeps waiting either way.
    pub stall_warn_yields: u64,
}

impl Default for LeftRightConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 0,
            stall_warn_yields: DEFAULT_STALL_WARN_YIELDS,
        }
    }
}

impl LeftRightConfig {
    /// Parses and validates a config from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`LeftRightError::ConfigParse`] on malformed TOML or unknown
    /// keys, and [`LeftRightError::InvalidConfig`] if validation fails.
    pub fn from_toml_str(source: &str) -> LeftRightResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a config file.
    ///
    /// # Errors
    ///
    /// Returns [`LeftRightError::ConfigRead`] if the file cannot be read,
    /// otherwise the same errors as [`LeftRightConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> LeftRightResult<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| LeftRightError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`LeftRightError::InvalidConfig`] if `stall_warn_yields` is zero.
    pub fn validate(&self) -> LeftRightResult<()> {
        if self.stall_warn_yields == 0 {
            return Err(LeftRightError::InvalidConfig(
                "stall_warn_yields must be greater than zero".to_owned(),
            ));
        }
        Ok(())
    }
}
