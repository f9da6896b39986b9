//! # Stress Error Types

use leftright_core::LeftRightError;
use thiserror::Error;

/// Errors that end a stress run.
#[derive(Error, Debug)]
pub enum StressError {
    /// Configuration could not be read, parsed or validated.
    #[error(transparent)]
    Config(#[from] LeftRightError),

    /// A reader saw a value the writer never published for that key.
    #[error("reader {reader} saw an inconsistent value for key {key}: {detail}")]
    TornRead {
        /// Index of the reader thread.
        reader: usize,
        /// The key that was looked up.
        key: u64,
        /// What was wrong with the value.
        detail: String,
    },

    /// A reader did not see an empty map after the final publish.
    #[error("reader {reader} saw {len} entries after the final publish")]
    NotConverged {
        /// Index of the reader thread.
        reader: usize,
        /// Entries it observed.
        len: usize,
    },

    /// A reader thread panicked.
    #[error("reader thread {0} panicked")]
    ReaderPanicked(usize),
}

/// Result type for stress runs.
pub type StressResult<T> = Result<T, StressError>;
