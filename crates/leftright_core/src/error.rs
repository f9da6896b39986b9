//! # Error Types
//!
//! The map itself never fails: lookups return `Option`, publish always
//! completes. Errors only come from loading configuration.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while configuring a left-right map.
#[derive(Error, Debug)]
pub enum LeftRightError {
    /// The config file could not be read.
    #[error("failed to read config {}: {source}", path.display())]
    ConfigRead {
        /// The file that was requested.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The config parsed but a value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for configuration operations.
pub type LeftRightResult<T> = Result<T, LeftRightError>;
