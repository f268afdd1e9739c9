use core::{fmt, ops::ControlFlow};

use chrono::NaiveDateTime;

use crate::{
    chunk::{ChunkLayout, SerialChunk, SerialState},
    error::{Error, Result},
    mutex::lock,
    state::{ChunkName, SnoKey, registry::Registry},
    store::BackingStore,
};

/// A point-in-time copy of one serial-number counter.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SnoSnapshot {
    pub table: String,
    pub column: String,
    /// Chunk names joined with `,`.
    pub chunk_key: String,
    /// Last serial number handed out, or the value set by a reset.
    pub value: String,
    /// The `SerialNo` chunk's counter behind `value`.
    pub counter: i64,
}

impl fmt::Display for SnoSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} [{}] = {}",
            self.table, self.column, self.chunk_key, self.value
        )
    }
}

struct SnoState {
    serial: SerialState,
    last: String,
    /// Layout of the last allocation, needed to decompose reset values.
    chunks: Vec<SerialChunk>,
}

/// In-memory serial-number counters, one per [`SnoKey`], each behind its own
/// lock.
#[derive(Default)]
pub struct SnoStore {
    registry: Registry<SnoKey, SnoState>,
}

impl SnoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders the next serial number for `key` at time `now`.
    ///
    /// On first use the counter is hydrated: it starts one step before the
    /// `SerialNo` chunk's `start`, or resumes from the greatest value the
    /// store holds for the current cycle when the layout allows telling
    /// cycles apart (see [`ChunkLayout::resume_prefix`]). Stored values that
    /// do not fit the layout are ignored.
    ///
    /// # Errors
    ///
    /// Any render error of [`ChunkLayout::render`], or
    /// [`Error::BackingStore`] if hydration fails. The counter is unchanged
    /// after an error.
    pub fn allocate<S: BackingStore + ?Sized>(
        &self,
        store: &S,
        key: &SnoKey,
        layout: &ChunkLayout<'_>,
        now: &NaiveDateTime,
    ) -> Result<String> {
        let slot = self.registry.slot(key)?;
        let mut guard = lock!(slot);

        let rendered = match guard.as_ref() {
            Some(state) => layout.render(&state.serial, now)?,
            None => layout.render(&hydrate(store, key, layout, now)?, now)?,
        };

        #[cfg(feature = "tracing")]
        if rendered.cycled && guard.is_some() {
            tracing::debug!(%key, anchor = %rendered.state.anchor, "serial number cycled");
        }

        match guard.as_mut() {
            Some(state) => {
                state.serial = rendered.state;
                state.last.clone_from(&rendered.text);
                if !same_specs(&state.chunks, layout.chunks()) {
                    state.chunks = layout.chunks().to_vec();
                }
            }
            None => {
                *guard = Some(SnoState {
                    serial: rendered.state,
                    last: rendered.text.clone(),
                    chunks: layout.chunks().to_vec(),
                });
            }
        }
        Ok(rendered.text)
    }

    /// Sets the counter for `key` from a serial number in the current
    /// layout, so the next allocation continues after it. `None` forgets the
    /// counter so the next allocation hydrates again.
    ///
    /// # Errors
    ///
    /// - [`Error::UntrackedSequence`] if `value` is given for a key this
    ///   store holds no layout for.
    /// - [`Error::InvalidArgument`] if `value` does not fit the layout.
    pub fn reset(&self, key: &SnoKey, value: Option<&str>, now: &NaiveDateTime) -> Result<()> {
        let untracked = || Error::UntrackedSequence {
            table: key.table().to_owned(),
            column: key.column().to_owned(),
            chunks: key.chunk_key(),
        };

        let Some(slot) = self.registry.existing(key)? else {
            return match value {
                Some(_) => Err(untracked()),
                None => Ok(()),
            };
        };
        let mut guard = lock!(slot);

        let Some(value) = value else {
            *guard = None;
            return Ok(());
        };
        let state = guard.as_mut().ok_or_else(untracked)?;
        let serial = ChunkLayout::new(&state.chunks)?.decompose(value, now)?;
        state.serial = serial;
        value.clone_into(&mut state.last);
        Ok(())
    }

    /// Copies every tracked counter matching the optional filters, ordered
    /// by key. Nothing is mutated.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockPoisoned`] when a lock was poisoned.
    pub fn show<C: ChunkName>(
        &self,
        table: Option<&str>,
        column: Option<&str>,
        chunks: Option<&[C]>,
    ) -> Result<Vec<SnoSnapshot>> {
        let mut selected = self
            .registry
            .select(|key| key.matches(table, column, chunks))?;
        selected.sort_by(|(a, _), (b, _)| a.cmp(b));

        let mut out = Vec::with_capacity(selected.len());
        for (key, slot) in selected {
            let guard = lock!(slot);
            if let Some(state) = guard.as_ref() {
                out.push(SnoSnapshot {
                    table: key.table().to_owned(),
                    column: key.column().to_owned(),
                    chunk_key: key.chunk_key(),
                    value: state.last.clone(),
                    counter: state.serial.current,
                });
            }
        }
        Ok(out)
    }
}

/// Whether two chunk lists share every spec allocation. Names need no check:
/// they are the key. Specs from the manager's cache, or chunks the caller
/// reuses, are the same allocation, so the common case never compares
/// format contents.
fn same_specs(stored: &[SerialChunk], chunks: &[SerialChunk]) -> bool {
    stored.len() == chunks.len() && stored.iter().zip(chunks).all(|(a, b)| a.shares_spec(b))
}

fn hydrate<S: BackingStore + ?Sized>(
    store: &S,
    key: &SnoKey,
    layout: &ChunkLayout<'_>,
    now: &NaiveDateTime,
) -> Result<SerialState> {
    let mut state = layout.initial_state(now)?;

    if let Some(resume) = layout.resume_prefix(now)? {
        let mut found: Option<i64> = None;
        let mut visit = |value: &str| match layout.decompose(value, now) {
            Ok(earlier) if earlier.anchor == state.anchor => {
                found = found.max(Some(earlier.current));
                if resume.ordered {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            }
            Ok(_) => ControlFlow::Continue(()),
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(%key, value, error = %_e, "skipping stored value");
                ControlFlow::Continue(())
            }
        };
        store
            .scan_prefix(key.table(), key.column(), &resume.text, &mut visit)
            .map_err(|e| {
                #[cfg(feature = "tracing")]
                tracing::warn!(%key, error = %e, "backing store read failed");
                Error::BackingStore(e)
            })?;
        if let Some(found) = found {
            state.current = state.current.max(found);
        }
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(%key, current = state.current, "hydrated serial number");
    Ok(state)
}
