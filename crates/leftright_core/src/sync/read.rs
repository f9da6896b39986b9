//! # Read Handle
//!
//! Lock-free lookups against whatever the writer last published.

use std::borrow::Borrow;
use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::registry::{Epoch, EpochId};

use super::storage::DualStorage;

/// Read access to a left-right map.
///
/// Every lookup is bracketed by two increments of this handle's own epoch
/// counter and reads the published slot. No lock, no wait.
///
/// # Thread Safety
///
/// A handle is `Send` but not `Sync`: it may move between threads but must
/// only be used by one at a time. Clone it to read from more threads; each
/// clone registers its own epoch.
///
/// ## Usage
///
/// ```rust
/// let (reader, mut writer) = leftright_core::new();
///
/// writer.insert("foo", "hello");
/// assert_eq!(reader.get("foo"), None);
///
/// writer.publish();
/// assert_eq!(reader.get("foo"), Some("hello"));
///
/// let other = reader.clone();
/// std::thread::spawn(move || assert_eq!(other.get("foo"), Some("hello")))
///     .join()
///     .unwrap();
/// ```
pub struct ReadHandle<K, V> {
    storage: Arc<DualStorage<K, V>>,
    epoch: Arc<Epoch>,
    id: EpochId,
    /// Opts out of `Sync`: two threads must never share one epoch.
    _not_sync: PhantomData<Cell<()>>,
}

impl<K, V> ReadHandle<K, V> {
    /// Registers a new epoch and binds a handle to `storage`.
    pub(crate) fn register(storage: Arc<DualStorage<K, V>>) -> Self {
        let (id, epoch) = storage.readers().register();
        Self {
            storage,
            epoch,
            id,
            _not_sync: PhantomData,
        }
    }

    /// Identifier of this handle's epoch in the reader registry.
    #[inline]
    #[must_use]
    pub fn epoch_id(&self) -> EpochId {
        self.id
    }

    /// Number of entries in the published map.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.storage.read(&self.epoch, HashMap::len)
    }

    /// Returns true if the published map is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.storage.read(&self.epoch, HashMap::is_empty)
    }

    /// Unregisters this handle's epoch.
    ///
    /// Consuming `self` makes a second release impossible. Dropping the
    /// handle does the same thing.
    pub fn release(self) {
        drop(self);
    }
}

impl<K: Hash + Eq, V> ReadHandle<K, V> {
    /// Returns a clone of the published value for `key`.
    ///
    /// `None` means the key is absent from the last published state.
    #[inline]
    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.with_value(key, V::clone)
    }

    /// Runs `f` on the published value for `key` without cloning it.
    ///
    /// `f` runs inside the read bracket. It must be short and must not
    /// block: a publish in progress waits for it to return.
    #[inline]
    pub fn with_value<Q, R, F>(&self, key: &Q, f: F) -> Option<R>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        F: FnOnce(&V) -> R,
    {
        self.storage.read(&self.epoch, |map| map.get(key).map(f))
    }

    /// Returns true if `key` is present in the published map.
    #[inline]
    #[must_use]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.storage.read(&self.epoch, |map| map.contains_key(key))
    }
}

impl<K, V> Clone for ReadHandle<K, V> {
    /// Registers a fresh epoch for the new handle.
    fn clone(&self) -> Self {
        Self::register(Arc::clone(&self.storage))
    }
}

impl<K, V> Drop for ReadHandle<K, V> {
    fn drop(&mut self) {
        self.storage.readers().unregister(self.id);
    }
}

impl<K, V> fmt::Debug for ReadHandle<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadHandle")
            .field("epoch_id", &self.id)
            .field("epoch", &self.epoch.load())
            .finish_non_exhaustive()
    }
}
