use std::{collections::HashMap, hash::Hash, sync::Arc};

use crate::{
    error::Result,
    mutex::{Mutex, RwLock, read_lock, write_lock},
};

#[cfg(feature = "cache-padded")]
type Padded<T> = crossbeam_utils::CachePadded<T>;
#[cfg(not(feature = "cache-padded"))]
type Padded<T> = T;

#[cfg(feature = "cache-padded")]
fn padded<T>(value: T) -> Padded<T> {
    crossbeam_utils::CachePadded::new(value)
}
#[cfg(not(feature = "cache-padded"))]
fn padded<T>(value: T) -> Padded<T> {
    value
}

/// One key's lock. `None` until the key is hydrated, and again after a reset
/// to null.
pub(crate) type Slot<V> = Arc<Padded<Mutex<Option<V>>>>;

/// Per-key locks, created on first use and kept for the life of the
/// registry.
///
/// Unrelated keys never contend: the map lock is only held long enough to
/// find or insert a slot, and all per-key work happens under the slot's own
/// mutex. Slots are never removed, so two callers can never end up holding
/// different locks for the same key.
pub(crate) struct Registry<K, V> {
    slots: RwLock<HashMap<K, Slot<V>>>,
}

impl<K, V> Default for Registry<K, V> {
    fn default() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone, V> Registry<K, V> {
    /// Returns the slot for `key`, creating an empty one if needed.
    pub(crate) fn slot(&self, key: &K) -> Result<Slot<V>> {
        if let Some(slot) = self.existing(key)? {
            return Ok(slot);
        }
        let mut slots = write_lock!(self.slots);
        Ok(Arc::clone(
            slots
                .entry(key.clone())
                .or_insert_with(|| Arc::new(padded(Mutex::new(None)))),
        ))
    }

    /// Returns the slot for `key` only if one was created before.
    pub(crate) fn existing(&self, key: &K) -> Result<Option<Slot<V>>> {
        let slots = read_lock!(self.slots);
        Ok(slots.get(key).map(Arc::clone))
    }

    /// Every slot whose key satisfies `filter`. The map lock is released
    /// before the caller locks any slot.
    pub(crate) fn select(&self, filter: impl Fn(&K) -> bool) -> Result<Vec<(K, Slot<V>)>> {
        let slots = read_lock!(self.slots);
        Ok(slots
            .iter()
            .filter(|(key, _)| filter(key))
            .map(|(key, slot)| (key.clone(), Arc::clone(slot)))
            .collect())
    }
}
