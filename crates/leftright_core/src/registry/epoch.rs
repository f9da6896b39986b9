//! # Epoch Registry
//!
//! Every read handle owns one [`Epoch`]: a counter it bumps when a lookup
//! starts and again when it ends. The writer uses parity only to pick which
//! readers to wait for; it waits until the value moves, not until it is even.
//!
//! ```text
//!   reader:  0 ──enter──> 1 ──exit──> 2 ──enter──> 3 ──exit──> 4 ...
//!                  (reading)              (reading)
//!
//!   writer:  snapshot = 3   ...yield...   live = 4   -> that read is over
//! ```
//!
//! The registry itself is a `parking_lot::Mutex` around a `slab::Slab`. The lock
//! is taken on register, unregister and once per publish. Never on a read.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use slab::Slab;

/// Stable identifier of a registered epoch.
///
/// Ids of unregistered epochs are reused by later registrations.
pub type EpochId = usize;

/// A reader's progress counter.
///
/// Even: no read in progress. Odd: a read is in progress.
/// Wraps at `u64::MAX`.
#[derive(Debug, Default)]
pub struct Epoch {
    counter: AtomicU64,
}

impl Epoch {
    /// Creates a counter at zero (idle).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
        }
    }

    /// Marks the start of a read and returns a guard that marks its end.
    ///
    /// The entering increment is `SeqCst` so it is ordered before the
    /// published-index load that follows it. The guard's exit increment is
    /// `Release` so every slot access completes before the writer can see it.
    ///
    /// A counter has one owning thread. If it is already odd the caller is
    /// nested inside its own read, so the inner bracket rides the outer one
    /// instead of flipping the counter back to even mid-read.
    #[inline]
    #[must_use = "dropping the guard ends the read immediately"]
    pub fn enter(&self) -> EpochGuard<'_> {
        if self.counter.load(Ordering::Relaxed) % 2 == 1 {
            return EpochGuard { epoch: None };
        }
        self.counter.fetch_add(1, Ordering::SeqCst);
        EpochGuard { epoch: Some(self) }
    }

    /// Current counter value.
    #[inline]
    #[must_use]
    pub fn load(&self) -> u64 {
        self.counter.load(Ordering::Acquire)
    }

    /// Returns true if the counter says a read is in progress.
    #[inline]
    #[must_use]
    pub fn is_reading(&self) -> bool {
        self.load() % 2 == 1
    }

    #[inline]
    fn exit(&self) {
        self.counter.fetch_add(1, Ordering::Release);
    }
}

/// Ends a read when dropped.
///
/// Holding the exit in a guard keeps the counter even after a lookup
/// unwinds, so a panicking `Hash`/`Eq` impl cannot stall the writer forever.
#[derive(Debug)]
pub struct EpochGuard<'a> {
    /// None for a nested bracket.
    epoch: Option<&'a Epoch>,
}

impl Drop for EpochGuard<'_> {
    #[inline]
    fn drop(&mut self) {
        if let Some(epoch) = self.epoch {
            epoch.exit();
        }
    }
}

/// One registered epoch as seen by the writer at snapshot time.
#[derive(Debug, Clone)]
pub struct EpochSnapshot {
    id: EpochId,
    epoch: Arc<Epoch>,
    observed: u64,
}

impl EpochSnapshot {
    /// Identifier of the epoch in the registry.
    #[inline]
    #[must_use]
    pub fn id(&self) -> EpochId {
        self.id
    }

    /// Counter value captured in the snapshot.
    #[inline]
    #[must_use]
    pub fn observed(&self) -> u64 {
        self.observed
    }

    /// Returns true if a read was in flight when the snapshot was taken.
    #[inline]
    #[must_use]
    pub fn was_reading(&self) -> bool {
        self.observed % 2 == 1
    }

    /// Returns true once the live counter differs from the captured value.
    ///
    /// Compares values, not parity: leaving one read and entering the next
    /// lands on a new odd value, which still proves the captured read ended.
    #[inline]
    #[must_use]
    pub fn has_advanced(&self) -> bool {
        self.epoch.load() != self.observed
    }
}

/// Mutex-guarded set of every live reader's epoch.
#[derive(Debug, Default)]
pub struct EpochRegistry {
    epochs: Mutex<Slab<Arc<Epoch>>>,
}

impl EpochRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty registry with room for `capacity` readers.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            epochs: Mutex::new(Slab::with_capacity(capacity)),
        }
    }

    /// Registers a fresh idle epoch.
    pub fn register(&self) -> (EpochId, Arc<Epoch>) {
        let epoch = Arc::new(Epoch::new());
        let id = self.epochs.lock().insert(Arc::clone(&epoch));
        tracing::trace!(epoch = id, "registered reader epoch");
        (id, epoch)
    }

    /// Stops tracking an epoch.
    ///
    /// Returns false if `id` was not registered.
    pub fn unregister(&self, id: EpochId) -> bool {
        let removed = self.epochs.lock().try_remove(id).is_some();
        tracing::trace!(epoch = id, removed, "unregistered reader epoch");
        removed
    }

    /// Number of registered epochs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.epochs.lock().len()
    }

    /// Returns true if no reader is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.epochs.lock().is_empty()
    }

    /// Captures every registered epoch and its current value under one lock.
    ///
    /// Readers registered after this returns are not included; they can only
    /// ever observe the published index as it stands now.
    #[must_use]
    pub fn snapshot(&self) -> Vec<EpochSnapshot> {
        let epochs = self.epochs.lock();
        epochs
            .iter()
            .map(|(id, epoch)| EpochSnapshot {
                id,
                observed: epoch.counter.load(Ordering::SeqCst),
                epoch: Arc::clone(epoch),
            })
            .collect()
    }
}
