//! # LEFTRIGHT Stress
//!
//! Race-safety harness for [`leftright_core`]: one writer cycling through
//! insert, overwrite and remove with a publish after each step, and many
//! reader threads checking that every value they see is one the writer
//! actually published, never torn, and that the map converges to empty.
//!
//! ## Example
//!
//! ```rust
//! use leftright_stress::{run, StressConfig};
//!
//! let config = StressConfig { readers: 2, keys: 16, rounds: 2, ..StressConfig::default() };
//! let report = run(&config).unwrap();
//! assert_eq!(report.publish.publishes, 6);
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod runner;

pub use config::StressConfig;
pub use error::{StressError, StressResult};
pub use runner::{run, StressReport};
