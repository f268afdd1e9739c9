use core::ops::ControlFlow;
use std::sync::Arc;

use crate::error::StoreError;

/// The durable counter source that in-memory sequences are hydrated from.
///
/// `seqid` never writes to the store: it only reads the highest value already
/// present in a column, either once per key (cached allocation) or on every
/// call (forced allocation). Implementations typically run
/// `SELECT MAX(column) FROM table`; any timeout or connection policy belongs
/// to the implementation, and its errors are handed to the caller verbatim
/// as [`crate::Error::BackingStore`].
pub trait BackingStore {
    /// The greatest integer value currently stored in `table.column`, or
    /// `None` if the column holds no values.
    ///
    /// # Errors
    ///
    /// Any failure of the underlying store.
    fn read_current_max(&self, table: &str, column: &str) -> Result<Option<i64>, StoreError>;

    /// Passes the textual values of `table.column` that start with `prefix`
    /// to `visit`, greatest first: longer values before shorter ones, equal
    /// lengths in descending order. Stops once `visit` returns
    /// [`ControlFlow::Break`].
    ///
    /// Used to resume a serial number after a restart; values that do not
    /// fit the sequence's layout are skipped by the caller. A SQL store would
    /// stream `... WHERE column LIKE 'prefix%' ORDER BY LEN(column) DESC,
    /// column DESC`. Stores that cannot answer keep the default, and serial
    /// numbers then start from their configured `start` on first use.
    ///
    /// # Errors
    ///
    /// Any failure of the underlying store.
    fn scan_prefix(
        &self,
        table: &str,
        column: &str,
        prefix: &str,
        visit: &mut dyn FnMut(&str) -> ControlFlow<()>,
    ) -> Result<(), StoreError> {
        let _ = (table, column, prefix, visit);
        Ok(())
    }
}

impl<S: BackingStore + ?Sized> BackingStore for &S {
    fn read_current_max(&self, table: &str, column: &str) -> Result<Option<i64>, StoreError> {
        (**self).read_current_max(table, column)
    }

    fn scan_prefix(
        &self,
        table: &str,
        column: &str,
        prefix: &str,
        visit: &mut dyn FnMut(&str) -> ControlFlow<()>,
    ) -> Result<(), StoreError> {
        (**self).scan_prefix(table, column, prefix, visit)
    }
}

impl<S: BackingStore + ?Sized> BackingStore for Arc<S> {
    fn read_current_max(&self, table: &str, column: &str) -> Result<Option<i64>, StoreError> {
        (**self).read_current_max(table, column)
    }

    fn scan_prefix(
        &self,
        table: &str,
        column: &str,
        prefix: &str,
        visit: &mut dyn FnMut(&str) -> ControlFlow<()>,
    ) -> Result<(), StoreError> {
        (**self).scan_prefix(table, column, prefix, visit)
    }
}
