mod cache;
#[cfg(test)]
mod tests;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    chunk::{ChunkLayout, SerialChunk},
    error::Result,
    manager::cache::SpecCache,
    state::{ChunkName, IdKey, IdSnapshot, IdStore, SnoKey, SnoSnapshot, SnoStore},
    store::BackingStore,
    time::{LocalClock, TimeSource},
};

/// Entry point for allocating table IDs and serial numbers.
///
/// A manager owns the in-memory counters of every key it has touched. Create
/// one per process (or per test) and share it by reference; there is no
/// global instance. The backing store is passed to each allocating call, so
/// one manager can serve several stores as long as their table names do not
/// collide.
///
/// All methods take `&self` and are safe to call concurrently. Each key has
/// its own lock; calls on different keys never wait on each other.
///
/// # Example
///
/// ```
/// use seqid::{MemoryStore, SequenceManager, SerialChunk};
///
/// let store = MemoryStore::new();
/// store.insert_id("SysUser", "Id", 41)?;
///
/// let manager = SequenceManager::default();
/// assert_eq!(manager.new_id(&store, "SysUser", "Id")?, 42);
/// assert_eq!(manager.new_id(&store, "SysUser", "Id")?, 43);
///
/// let chunks = [
///     SerialChunk::new("Prefix", "Text[INV][3]")?,
///     SerialChunk::new("SerialNo", "SerialNo[,,5,,none]")?,
/// ];
/// assert_eq!(manager.new_sno(&store, "Invoice", "No", &chunks)?, "INV00001");
/// assert_eq!(manager.new_sno(&store, "Invoice", "No", &chunks)?, "INV00002");
/// # Ok::<(), seqid::Error>(())
/// ```
pub struct SequenceManager<T = LocalClock>
where
    T: TimeSource,
{
    clock: T,
    ids: IdStore,
    snos: SnoStore,
    specs: SpecCache,
}

impl Default for SequenceManager<LocalClock> {
    fn default() -> Self {
        Self::new(LocalClock)
    }
}

impl<T> SequenceManager<T>
where
    T: TimeSource,
{
    /// Creates a manager with empty state that reads the time from `clock`.
    pub fn new(clock: T) -> Self {
        Self {
            clock,
            ids: IdStore::new(),
            snos: SnoStore::new(),
            specs: SpecCache::default(),
        }
    }

    /// The manager's time source.
    pub fn clock(&self) -> &T {
        &self.clock
    }

    /// Allocates the next ID for `table.column` from the in-memory counter,
    /// hydrating it from `store` on first use.
    ///
    /// Use this for frequently allocated keys owned by this process. If
    /// other writers insert into the same column, prefer
    /// [`Self::new_id_force`].
    ///
    /// # Errors
    ///
    /// See [`IdStore::allocate`]; also [`crate::Error::InvalidArgument`] for
    /// empty names.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self, store), err))]
    pub fn new_id<S>(&self, store: &S, table: &str, column: &str) -> Result<i64>
    where
        S: BackingStore + ?Sized,
    {
        self.ids.allocate(store, &IdKey::new(table, column)?)
    }

    /// Allocates `MAX(column) + 1`, read from `store` under the key's lock on
    /// every call.
    ///
    /// # Errors
    ///
    /// See [`IdStore::allocate_force`]; also
    /// [`crate::Error::InvalidArgument`] for empty names.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self, store), err))]
    pub fn new_id_force<S>(&self, store: &S, table: &str, column: &str) -> Result<i64>
    where
        S: BackingStore + ?Sized,
    {
        self.ids.allocate_force(store, &IdKey::new(table, column)?)
    }

    /// Sets the ID counter of `table.column` so the next allocation yields
    /// `value + 1`. `None` drops the counter; the next allocation then
    /// re-hydrates from the store.
    ///
    /// # Errors
    ///
    /// [`crate::Error::InvalidArgument`] for empty names.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self), err))]
    pub fn reset_id(&self, table: &str, column: &str, value: Option<i64>) -> Result<()> {
        self.ids.reset(&IdKey::new(table, column)?, value)
    }

    /// Starts tracking `table.column` at `value` (the next ID is
    /// `value + 1`) without reading the store.
    ///
    /// # Errors
    ///
    /// [`crate::Error::AlreadyTracked`] if the key already has a counter.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self), err))]
    pub fn add_id(&self, table: &str, column: &str, value: i64) -> Result<()> {
        self.ids.add(&IdKey::new(table, column)?, value)
    }

    /// Lists the cached ID counters, optionally filtered by table and/or
    /// column.
    ///
    /// # Errors
    ///
    /// Only lock poisoning.
    pub fn show_current_ids(
        &self,
        table: Option<&str>,
        column: Option<&str>,
    ) -> Result<Vec<IdSnapshot>> {
        self.ids.show(table, column)
    }

    /// Renders the next serial number for `table.column` in the layout given
    /// by `chunks`.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::InvalidArgument`] for empty names or an empty list.
    /// - [`crate::Error::InvalidChunks`] if the list does not hold exactly
    ///   one `SerialNo` chunk or misplaces `[varlen]`.
    /// - Any render or store error of [`SnoStore::allocate`].
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "trace", skip(self, store, chunks), err)
    )]
    pub fn new_sno<S>(
        &self,
        store: &S,
        table: &str,
        column: &str,
        chunks: &[SerialChunk],
    ) -> Result<String>
    where
        S: BackingStore + ?Sized,
    {
        let key = SnoKey::new(table, column, chunks)?;
        let layout = ChunkLayout::new(chunks)?;
        self.snos.allocate(store, &key, &layout, &self.clock.now())
    }

    /// Like [`Self::new_sno`], but takes `(name, format)` pairs. Each
    /// distinct format string is parsed once and reused afterwards.
    ///
    /// # Errors
    ///
    /// [`crate::Error::FormatSyntax`] for a malformed format, otherwise as
    /// [`Self::new_sno`].
    pub fn new_sno_from_formats<S, N, F>(
        &self,
        store: &S,
        table: &str,
        column: &str,
        chunks: &[(N, F)],
    ) -> Result<String>
    where
        S: BackingStore + ?Sized,
        N: AsRef<str>,
        F: AsRef<str>,
    {
        let chunks = chunks
            .iter()
            .map(|(name, format)| {
                Ok(SerialChunk::from_spec(
                    name.as_ref(),
                    self.specs.resolve(format.as_ref())?,
                ))
            })
            .collect::<Result<Vec<_>>>()?;
        self.new_sno(store, table, column, &chunks)
    }

    /// Sets the serial-number counter addressed by the chunk *names* so the
    /// next allocation continues after `value`, which must be a serial
    /// number in the layout last allocated for that key. `None` drops the
    /// counter so the next allocation hydrates again.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::InvalidArgument`] for empty names, an empty list or
    ///   a `value` that does not fit the layout.
    /// - [`crate::Error::UntrackedSequence`] if no layout is known for the
    ///   key.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self, chunks), err))]
    pub fn reset_sno<C>(
        &self,
        table: &str,
        column: &str,
        chunks: &[C],
        value: Option<&str>,
    ) -> Result<()>
    where
        C: ChunkName,
    {
        let key = SnoKey::new(table, column, chunks)?;
        self.snos.reset(&key, value, &self.clock.now())
    }

    /// Lists the cached serial-number counters, optionally filtered by
    /// table, column and/or chunk names.
    ///
    /// # Errors
    ///
    /// Only lock poisoning.
    pub fn show_current_snos<C>(
        &self,
        table: Option<&str>,
        column: Option<&str>,
        chunks: Option<&[C]>,
    ) -> Result<Vec<SnoSnapshot>>
    where
        C: ChunkName,
    {
        self.snos.show(table, column, chunks)
    }
}
