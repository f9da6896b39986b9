//! # Reader Registry
//!
//! Tracks one progress counter per live read handle so the writer can tell
//! when every read that might still touch a stale slot has finished.
//!
//! ## Design
//!
//! - [`EpochRegistry`]: a `Mutex<slab::Slab<Arc<Epoch>>>`, locked only on
//!   reader creation/destruction and once per publish

mod epoch;

pub use epoch::{Epoch, EpochGuard, EpochId, EpochRegistry, EpochSnapshot};
