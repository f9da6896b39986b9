//! # Write Handle
//!
//! The single mutator. Writes land in the unpublished slot right away and are
//! logged; [`WriteHandle::publish`] makes them visible.
//!
//! ## Publish
//!
//! ```text
//!   1. SWAP      published ^= 1            readers now see the fresh slot
//!   2. SNAPSHOT  (id, epoch) of every registered reader
//!   3. DRAIN     for every odd epoch: yield until it has changed
//!   4. REPLAY    apply the log to the slot just drained, clear the log
//! ```
//!
//! A reader with an odd epoch at snapshot time may have loaded the old index,
//! so the old slot is not touched until its epoch moves. An even epoch means
//! the reader was idle, and any read it starts later sees the new index.
//!
//! ## Safety Note
//!
//! Mutating the unpublished slot is `unsafe`: it is sound only because this
//! handle is unique and never touches the slot mid-drain.

#![allow(unsafe_code)]

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::thread;

use crate::config::LeftRightConfig;
use crate::registry::EpochSnapshot;

use super::oplog::Operation;
use super::read::ReadHandle;
use super::storage::DualStorage;

/// Cumulative publish statistics.
///
/// Useful for profiling drain overhead.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PublishStats {
    /// Completed publishes.
    pub publishes: u64,
    /// Operations replayed onto the drained slot.
    pub replayed_ops: u64,
    /// Readers that were mid-read at swap time and had to be waited on.
    pub readers_waited: u64,
    /// Times the writer yielded while draining.
    pub drain_yields: u64,
}

/// Write access to a left-right map.
///
/// Exactly one exists per map. It is not `Clone`.
///
/// ## Usage
///
/// ```rust
/// let (reader, mut writer) = leftright_core::new::<u32, String>();
///
/// writer.insert(1, "one".to_owned());
/// writer.insert(2, "two".to_owned());
/// writer.remove(1);
/// assert_eq!(writer.pending(), 3);
///
/// writer.publish();
/// assert_eq!(writer.pending(), 0);
/// assert_eq!(reader.get(&1), None);
/// assert_eq!(reader.get(&2).as_deref(), Some("two"));
/// ```
pub struct WriteHandle<K, V> {
    storage: Arc<DualStorage<K, V>>,
    /// Mutations since the last publish, in order.
    oplog: Vec<Operation<K, V>>,
    /// Yields in one drain before a stall warning is logged.
    stall_warn_yields: u64,
    stats: PublishStats,
}

impl<K, V> WriteHandle<K, V> {
    pub(crate) fn new(storage: Arc<DualStorage<K, V>>, config: &LeftRightConfig) -> Self {
        Self {
            storage,
            oplog: Vec::new(),
            stall_warn_yields: config.stall_warn_yields,
            stats: PublishStats::default(),
        }
    }

    /// Number of logged operations not yet published.
    #[inline]
    #[must_use]
    pub fn pending(&self) -> usize {
        self.oplog.len()
    }

    /// The logged operations not yet published, oldest first.
    #[inline]
    #[must_use]
    pub fn oplog(&self) -> &[Operation<K, V>] {
        &self.oplog
    }

    /// Number of registered read handles.
    #[must_use]
    pub fn reader_count(&self) -> usize {
        self.storage.readers().len()
    }

    /// Creates a new read handle on this map.
    #[must_use]
    pub fn reader(&self) -> ReadHandle<K, V> {
        ReadHandle::register(Arc::clone(&self.storage))
    }

    /// Cumulative publish statistics.
    #[inline]
    #[must_use]
    pub fn stats(&self) -> PublishStats {
        self.stats
    }

    /// Readers that were mid-read when the registry was snapshotted.
    fn in_flight(&self) -> Vec<EpochSnapshot> {
        self.storage
            .readers()
            .snapshot()
            .into_iter()
            .filter(EpochSnapshot::was_reading)
            .collect()
    }

    /// Waits until every reader in `in_flight` has left the read it was in.
    ///
    /// Returns (readers waited on, yields).
    fn drain(&self, mut in_flight: Vec<EpochSnapshot>) -> (u64, u64) {
        let waited = in_flight.len() as u64;

        let mut yields = 0u64;
        let mut warned = false;
        loop {
            in_flight.retain(|snapshot| !snapshot.has_advanced());
            if in_flight.is_empty() {
                break;
            }

            if !warned && yields >= self.stall_warn_yields {
                let stalled: Vec<usize> = in_flight.iter().map(EpochSnapshot::id).collect();
                tracing::warn!(
                    yields,
                    ?stalled,
                    "publish is still waiting on readers that started before the swap"
                );
                warned = true;
            }

            thread::yield_now();
            yields += 1;
        }

        (waited, yields)
    }
}

impl<K: Hash + Eq + Clone, V: Clone> WriteHandle<K, V> {
    /// Inserts or overwrites `key`. Invisible to readers until [`publish`].
    ///
    /// [`publish`]: WriteHandle::publish
    pub fn insert(&mut self, key: K, value: V) {
        // SAFETY: we are the only writer and no drain is open outside publish.
        unsafe {
            self.storage.with_unpublished(|map| {
                map.insert(key.clone(), value.clone());
            });
        }
        self.oplog.push(Operation::Insert(key, value));
    }

    /// Removes `key`. Readers keep seeing it until [`publish`].
    ///
    /// [`publish`]: WriteHandle::publish
    pub fn remove(&mut self, key: K) {
        // SAFETY: we are the only writer and no drain is open outside publish.
        unsafe {
            self.storage.with_unpublished(|map| {
                map.remove(&key);
            });
        }
        self.oplog.push(Operation::Remove(key));
    }

    /// Makes every logged mutation visible to all readers at once.
    ///
    /// Blocks (yielding, never sleeping) until every reader that was mid-read
    /// at swap time has finished that read. A reader that never finishes a
    /// read stalls this call forever; there is no timeout.
    pub fn publish(&mut self) {
        let published = self.storage.swap();
        let (readers_waited, drain_yields) = self.drain(self.in_flight());

        let replayed = self.oplog.len();
        let oplog = &mut self.oplog;
        // SAFETY: the drain above proved no pre-swap reader is still on the
        // slot that just became unpublished. Readers arriving after the swap
        // only ever load the other index.
        unsafe {
            self.storage.with_unpublished(|map: &mut HashMap<K, V>| {
                for op in oplog.drain(..) {
                    op.apply(map);
                }
            });
        }

        self.stats.publishes += 1;
        self.stats.replayed_ops += replayed as u64;
        self.stats.readers_waited += readers_waited;
        self.stats.drain_yields += drain_yields;

        tracing::debug!(
            published,
            replayed,
            readers_waited,
            drain_yields,
            "published left-right map"
        );
    }
}

impl<K, V> fmt::Debug for WriteHandle<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteHandle")
            .field("published", &self.storage.published_index())
            .field("pending", &self.oplog.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
