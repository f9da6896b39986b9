//! # Operation Log
//!
//! Every mutation the writer applies to the unpublished slot is also recorded
//! here. After a publish has drained the old slot, the log is replayed onto it
//! in order so both replicas agree again.

use std::collections::HashMap;
use std::hash::Hash;

/// One pending mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation<K, V> {
    /// Insert or overwrite `key` with a value.
    Insert(K, V),
    /// Remove `key` if present.
    Remove(K),
}

impl<K, V> Operation<K, V> {
    /// The key this operation touches.
    #[inline]
    #[must_use]
    pub fn key(&self) -> &K {
        match self {
            Self::Insert(key, _) | Self::Remove(key) => key,
        }
    }
}

impl<K: Hash + Eq, V> Operation<K, V> {
    /// Applies the operation to a map, consuming it.
    #[inline]
    pub(crate) fn apply(self, map: &mut HashMap<K, V>) {
        match self {
            Self::Insert(key, value) => {
                map.insert(key, value);
            }
            Self::Remove(key) => {
                map.remove(&key);
            }
        }
    }
}
