//! # LEFTRIGHT Core
//!
//! A concurrent map with lock-free reads and a single writer that decides
//! when its changes become visible.
//!
//! ## Architecture Rules
//!
//! 1. **Readers never block** - a lookup is two atomic increments and one
//!    atomic load around an ordinary hash map read
//! 2. **One writer** - [`WriteHandle`] is produced once and never cloned
//! 3. **Atomic visibility** - mutations between two publishes are never
//!    partially visible
//!
//! ## Example
//!
//! ```rust
//! let (reader, mut writer) = leftright_core::new();
//!
//! writer.insert("foo", "hello");
//! writer.insert("bar", "world");
//! assert_eq!(reader.get("foo"), None);
//!
//! writer.publish();
//! assert_eq!(reader.get("foo"), Some("hello"));
//! assert_eq!(reader.len(), 2);
//! ```
//!
//! ## Liveness
//!
//! [`WriteHandle::publish`] waits for every read that was in flight when it
//! swapped. Reads must be finite: a closure passed to
//! [`ReadHandle::with_value`] that never returns stalls the writer forever.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod registry;
pub mod sync;

use std::hash::Hash;
use std::sync::Arc;

pub use config::LeftRightConfig;
pub use error::{LeftRightError, LeftRightResult};
pub use registry::{Epoch, EpochId, EpochRegistry};
pub use sync::{Operation, PublishStats, ReadHandle, WriteHandle};

/// Creates an empty map and returns its first reader and its only writer.
///
/// Clone the reader for every additional thread that reads.
#[must_use]
pub fn new<K, V>() -> (ReadHandle<K, V>, WriteHandle<K, V>)
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    with_config(&LeftRightConfig::default())
}

/// Like [`new`], with explicit tuning.
///
/// The config is used as given; call [`LeftRightConfig::validate`] first if it
/// did not come from [`LeftRightConfig::load`].
#[must_use]
pub fn with_config<K, V>(config: &LeftRightConfig) -> (ReadHandle<K, V>, WriteHandle<K, V>)
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    let storage = Arc::new(sync::DualStorage::with_capacity(config.initial_capacity));
    let reader = ReadHandle::register(Arc::clone(&storage));
    let writer = WriteHandle::new(storage, config);
    tracing::debug!(
        initial_capacity = config.initial_capacity,
        stall_warn_yields = config.stall_warn_yields,
        "created left-right map"
    );
    (reader, writer)
}
