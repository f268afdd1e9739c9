use core::fmt;

use crate::{
    error::{Error, Result},
    mutex::lock,
    state::{IdKey, registry::Registry},
    store::BackingStore,
};

/// A point-in-time copy of one ID counter.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IdSnapshot {
    pub table: String,
    pub column: String,
    /// Last value handed out.
    pub value: i64,
}

impl fmt::Display for IdSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} = {}", self.table, self.column, self.value)
    }
}

/// In-memory integer ID counters, one per [`IdKey`], each behind its own
/// lock.
#[derive(Default)]
pub struct IdStore {
    registry: Registry<IdKey, i64>,
}

impl IdStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next ID for `key` from the in-memory counter.
    ///
    /// The first allocation for a key reads the column's current maximum
    /// from `store` (an empty column counts as `0`); every later one
    /// increments in memory without touching the store. Hydration happens
    /// under the key's lock, so concurrent first callers cannot both start
    /// from the same maximum.
    ///
    /// # Errors
    ///
    /// - [`Error::BackingStore`] if hydration fails; nothing is cached then.
    /// - [`Error::SequenceExhausted`] if the counter reached `i64::MAX`.
    pub fn allocate<S: BackingStore + ?Sized>(&self, store: &S, key: &IdKey) -> Result<i64> {
        let slot = self.registry.slot(key)?;
        let mut state = lock!(slot);

        let current = match *state {
            Some(current) => current,
            None => {
                let max = read_max(store, key)?;
                #[cfg(feature = "tracing")]
                tracing::debug!(%key, max, "hydrated ID counter");
                max
            }
        };

        let next = successor(key, current)?;
        *state = Some(next);
        Ok(next)
    }

    /// Allocates `MAX(column) + 1`, read from `store` on every call.
    ///
    /// The cached counter is never consulted. It is raised to the returned
    /// value if it lags behind, so the cached path does not hand the same ID
    /// out again. Two forced calls return the same value unless the first
    /// one was persisted in between; that is the caller's contract.
    ///
    /// # Errors
    ///
    /// - [`Error::BackingStore`] if the read fails.
    /// - [`Error::SequenceExhausted`] if the column already holds `i64::MAX`.
    pub fn allocate_force<S: BackingStore + ?Sized>(&self, store: &S, key: &IdKey) -> Result<i64> {
        let slot = self.registry.slot(key)?;
        let mut state = lock!(slot);

        let next = successor(key, read_max(store, key)?)?;
        if let Some(cached) = state.as_mut() {
            *cached = (*cached).max(next);
        }
        Ok(next)
    }

    /// Sets the counter for `key` so the next allocation yields `value + 1`,
    /// or forgets it when `value` is `None` so the next allocation
    /// re-hydrates from the store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockPoisoned`] when a lock was poisoned.
    pub fn reset(&self, key: &IdKey, value: Option<i64>) -> Result<()> {
        let slot = match value {
            Some(_) => self.registry.slot(key)?,
            None => match self.registry.existing(key)? {
                Some(slot) => slot,
                None => return Ok(()),
            },
        };
        let mut state = lock!(slot);
        *state = value;
        Ok(())
    }

    /// Starts tracking `key` at `value` without consulting the store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyTracked`] if `key` already has a counter.
    pub fn add(&self, key: &IdKey, value: i64) -> Result<()> {
        let slot = self.registry.slot(key)?;
        let mut state = lock!(slot);
        if state.is_some() {
            return Err(Error::AlreadyTracked {
                table: key.table().to_owned(),
                column: key.column().to_owned(),
            });
        }
        *state = Some(value);
        Ok(())
    }

    /// Copies every tracked counter matching the optional filters, ordered
    /// by table and column. Nothing is mutated.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockPoisoned`] when a lock was poisoned.
    pub fn show(&self, table: Option<&str>, column: Option<&str>) -> Result<Vec<IdSnapshot>> {
        let mut out = Vec::new();
        for (key, slot) in self.registry.select(|key| key.matches(table, column))? {
            let state = lock!(slot);
            if let Some(value) = *state {
                out.push(IdSnapshot {
                    table: key.table().to_owned(),
                    column: key.column().to_owned(),
                    value,
                });
            }
        }
        out.sort_by(|a, b| (&a.table, &a.column).cmp(&(&b.table, &b.column)));
        Ok(out)
    }
}

fn read_max<S: BackingStore + ?Sized>(store: &S, key: &IdKey) -> Result<i64> {
    match store.read_current_max(key.table(), key.column()) {
        Ok(max) => Ok(max.unwrap_or(0)),
        Err(e) => {
            #[cfg(feature = "tracing")]
            tracing::warn!(%key, error = %e, "backing store read failed");
            Err(Error::BackingStore(e))
        }
    }
}

fn successor(key: &IdKey, current: i64) -> Result<i64> {
    current.checked_add(1).ok_or_else(|| Error::SequenceExhausted {
        chunk: key.column().to_owned(),
        value: current,
        end: i64::MAX,
    })
}
