use core::ops::ControlFlow;
use std::{
    collections::{BTreeSet, HashMap},
    sync::atomic::{AtomicUsize, Ordering},
};

use crate::{
    error::{Result, StoreError},
    mutex::{RwLock, read_lock, write_lock},
    store::BackingStore,
};

#[derive(Debug, Default)]
struct Column {
    ids: BTreeSet<i64>,
    texts: BTreeSet<String>,
}

/// A [`BackingStore`] holding its columns in memory.
///
/// Useful in tests and as a reference for real implementations. Every read
/// is counted so callers can observe how often the engine went to the store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    columns: RwLock<HashMap<(String, String), Column>>,
    reads: AtomicUsize,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an integer value as present in `table.column`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LockPoisoned`] if a writer panicked.
    pub fn insert_id(&self, table: &str, column: &str, value: i64) -> Result<()> {
        let mut columns = write_lock!(self.columns);
        columns
            .entry((table.to_owned(), column.to_owned()))
            .or_default()
            .ids
            .insert(value);
        Ok(())
    }

    /// Records a textual value as present in `table.column`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LockPoisoned`] if a writer panicked.
    pub fn insert_text(&self, table: &str, column: &str, value: impl Into<String>) -> Result<()> {
        let mut columns = write_lock!(self.columns);
        columns
            .entry((table.to_owned(), column.to_owned()))
            .or_default()
            .texts
            .insert(value.into());
        Ok(())
    }

    /// How many times the store has been read.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    fn max_id(&self, table: &str, column: &str) -> Result<Option<i64>> {
        let columns = read_lock!(self.columns);
        Ok(columns
            .get(&(table.to_owned(), column.to_owned()))
            .and_then(|c| c.ids.last().copied()))
    }

    /// Matching texts, greatest first. Copied out so no lock is held while
    /// the caller inspects them.
    fn texts_with_prefix(&self, table: &str, column: &str, prefix: &str) -> Result<Vec<String>> {
        let columns = read_lock!(self.columns);
        let mut found: Vec<String> = columns
            .get(&(table.to_owned(), column.to_owned()))
            .map(|c| {
                c.texts
                    .iter()
                    .filter(|t| t.starts_with(prefix))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        // longer values are larger: variable-width serials outgrow their
        // lexicographic order
        found.sort_unstable_by(|a, b| b.len().cmp(&a.len()).then_with(|| b.cmp(a)));
        Ok(found)
    }
}

impl BackingStore for MemoryStore {
    fn read_current_max(&self, table: &str, column: &str) -> Result<Option<i64>, StoreError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(self.max_id(table, column)?)
    }

    fn scan_prefix(
        &self,
        table: &str,
        column: &str,
        prefix: &str,
        visit: &mut dyn FnMut(&str) -> ControlFlow<()>,
    ) -> Result<(), StoreError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        for value in self.texts_with_prefix(table, column, prefix)? {
            if visit(&value).is_break() {
                break;
            }
        }
        Ok(())
    }
}
