//! # Dual Storage
//!
//! Two map slots and an atomic index naming the published one.
//!
//! ## Safety Note
//!
//! Readers and the writer touch the slots through `UnsafeCell`. Access is
//! partitioned by the published index and the epoch protocol, not by a lock.

#![allow(unsafe_code)]
//!
//! ## Architecture
//!
//! ```text
//!                    ┌─────────────────────────────┐
//!                    │         DualStorage         │
//!                    │                             │
//!                    │  ┌─────────┐  ┌─────────┐   │
//!                    │  │ Slot 0  │  │ Slot 1  │   │
//!                    │  └────┬────┘  └────┬────┘   │
//!                    │       │            │        │
//!                    │  ┌────┴────────────┴────┐   │
//!                    │  │ Published Index (0/1)│   │
//!                    │  └──────────────────────┘   │
//!                    │  ┌──────────────────────┐   │
//!                    │  │    EpochRegistry     │   │
//!                    │  └──────────────────────┘   │
//!                    └─────────────────────────────┘
//!                              │
//!              ┌───────────────┴───────────────┐
//!              ▼                               ▼
//!      ┌──────────────┐                ┌──────────────┐
//!      │ WriteHandle  │                │ ReadHandle×N │
//!      │ (unpublished)│                │  (published) │
//!      └──────────────┘                └──────────────┘
//! ```
//!
//! ## Access Rules
//!
//! - Readers only dereference the slot named by the published index, and
//!   only inside an epoch bracket.
//! - The writer only mutates the other slot, and after a swap only once
//!   every reader that might still be on it has been drained.

use std::cell::UnsafeCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::registry::{Epoch, EpochRegistry};

/// Two map replicas behind an atomically selected published index.
///
/// Both slots start empty with slot 0 published.
pub(crate) struct DualStorage<K, V> {
    /// The two replicas.
    slots: [UnsafeCell<HashMap<K, V>>; 2],

    /// Index of the slot readers observe (0 or 1).
    /// The writer owns `published ^ 1`.
    published: AtomicUsize,

    /// Progress counters of every live reader.
    readers: EpochRegistry,
}

// SAFETY: Readers on many threads share `&HashMap` of the published slot
// (needs `K, V: Sync`). The writer mutates and drops entries of the other
// slot from its own thread (needs `K, V: Send`). The epoch protocol keeps
// those two sets of accesses disjoint in time per slot.
unsafe impl<K: Send + Sync, V: Send + Sync> Sync for DualStorage<K, V> {}

impl<K, V> DualStorage<K, V> {
    /// Creates empty storage, pre-sizing each slot for `capacity` entries.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: [
                UnsafeCell::new(HashMap::with_capacity(capacity)),
                UnsafeCell::new(HashMap::with_capacity(capacity)),
            ],
            published: AtomicUsize::new(0),
            readers: EpochRegistry::new(),
        }
    }

    /// The reader registry.
    #[inline]
    pub(crate) fn readers(&self) -> &EpochRegistry {
        &self.readers
    }

    /// Index of the slot readers currently observe.
    #[inline]
    pub(crate) fn published_index(&self) -> usize {
        self.published.load(Ordering::SeqCst)
    }

    /// Runs `f` against the published slot inside an epoch bracket.
    ///
    /// `epoch` must be the caller's own registered counter and must not be
    /// entered concurrently from another thread.
    #[inline]
    pub(crate) fn read<R>(&self, epoch: &Epoch, f: impl FnOnce(&HashMap<K, V>) -> R) -> R {
        let _guard = epoch.enter();
        let index = self.published_index();

        // SAFETY: The entering increment above is ordered before this load
        // (both SeqCst). If the writer swapped after our load, its snapshot
        // sees our odd counter and it waits for the guard's exit before it
        // touches this slot again. Otherwise we loaded the fresh index and
        // the writer will not mutate that slot until the next swap.
        let slot = unsafe { &*self.slots[index].get() };
        f(slot)
    }

    /// Runs `f` against the unpublished slot.
    ///
    /// # Safety
    ///
    /// Only the single writer may call this, and never between a swap and
    /// the end of the drain that follows it.
    #[inline]
    pub(crate) unsafe fn with_unpublished<R>(&self, f: impl FnOnce(&mut HashMap<K, V>) -> R) -> R {
        // Only the writer stores to `published`, so a relaxed load is current.
        let index = self.published.load(Ordering::Relaxed) ^ 1;
        f(&mut *self.slots[index].get())
    }

    /// Flips the published index and returns the newly published slot.
    ///
    /// The `SeqCst` RMW publishes every write made to the slot so far and
    /// is ordered before the registry snapshot that follows it.
    #[inline]
    pub(crate) fn swap(&self) -> usize {
        self.published.fetch_xor(1, Ordering::SeqCst) ^ 1
    }
}
