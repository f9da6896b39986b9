//! # Stress Configuration
//!
//! ```toml
//! readers = 16
//! keys = 1000
//! rounds = 20
//!
//! [map]
//! initial_capacity = 1000
//! ```

use std::fs;
use std::path::Path;

use leftright_core::{LeftRightConfig, LeftRightError};
use serde::Deserialize;

use crate::error::StressResult;

/// Largest accepted `rounds`. Round `r` writes generations `2r - 1` and `2r`.
pub const MAX_ROUNDS: u64 = u64::MAX / 2;

/// Parameters for one stress run.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StressConfig {
    /// Reader threads, each with its own cloned handle.
    pub readers: usize,
    /// Distinct keys the writer cycles through.
    pub keys: u64,
    /// Insert / overwrite / remove cycles. Each cycle publishes three times.
    pub rounds: u64,
    /// Settings for the map under test.
    pub map: LeftRightConfig,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            readers: 16,
            keys: 1000,
            rounds: 20,
            map: LeftRightConfig::default(),
        }
    }
}

impl StressConfig {
    /// Parses and validates a config from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a config error on malformed TOML or out-of-range values.
    pub fn from_toml_str(source: &str) -> StressResult<Self> {
        let config: Self = toml::from_str(source).map_err(LeftRightError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a config file.
    ///
    /// # Errors
    ///
    /// Returns a config error if the file cannot be read or is invalid.
    pub fn load(path: impl AsRef<Path>) -> StressResult<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| LeftRightError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Checks value ranges, including the nested map config.
    ///
    /// # Errors
    ///
    /// Returns a config error if any count is zero or `rounds` exceeds
    /// [`MAX_ROUNDS`].
    pub fn validate(&self) -> StressResult<()> {
        fn invalid(msg: &str) -> StressResult<()> {
            Err(LeftRightError::InvalidConfig(msg.to_owned()).into())
        }

        if self.readers == 0 {
            return invalid("readers must be greater than zero");
        }
        if self.keys == 0 {
            return invalid("keys must be greater than zero");
        }
        if self.rounds == 0 {
            return invalid("rounds must be greater than zero");
        }
        if self.rounds > MAX_ROUNDS {
            return invalid("rounds is too large to number every generation");
        }
        self.map.validate()?;
        Ok(())
    }
}
