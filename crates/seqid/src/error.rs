use core::fmt;

/// A boxed error returned by a [`crate::BackingStore`] implementation.
pub type StoreError = Box<dyn core::error::Error + Send + Sync + 'static>;

/// A result type defaulting to [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All error variants that `seqid` can emit.
///
/// Every variant is surfaced synchronously to the caller of the operation that
/// produced it. The library never retries and never falls back to stale cached
/// state after a failure; a failed allocation leaves the key's counter exactly
/// as it was.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A chunk format string did not match any recognized shape.
    #[error("invalid chunk format `{format}`: {reason}")]
    FormatSyntax {
        /// The offending format string.
        format: String,
        /// What the parser expected.
        reason: String,
    },

    /// A fixed-width `SerialNo` value needs more digits than the chunk
    /// declares.
    #[error("serial chunk `{chunk}` overflowed: {value} does not fit in {width} digits")]
    SequenceOverflow {
        /// Name of the serial chunk.
        chunk: String,
        /// The value that could not be rendered.
        value: i64,
        /// Declared width.
        width: usize,
    },

    /// A bounded `SerialNo` tried to advance past its `end` without a cycle
    /// reset.
    #[error("serial chunk `{chunk}` exhausted: {value} exceeds end {end}")]
    SequenceExhausted {
        /// Name of the serial chunk.
        chunk: String,
        /// The value the counter tried to reach.
        value: i64,
        /// Declared upper bound.
        end: i64,
    },

    /// The backing store failed while hydrating or recomputing a counter.
    #[error("backing store error: {0}")]
    BackingStore(#[source] StoreError),

    /// A `Text` or `DateTime` chunk rendered to a length other than its
    /// declared width.
    #[error("chunk `{chunk}` rendered `{rendered}` which is not {width} characters wide")]
    ConfigurationMismatch {
        /// Name of the chunk.
        chunk: String,
        /// What it rendered to.
        rendered: String,
        /// Declared width.
        width: usize,
    },

    /// The chunk list does not describe a usable serial number.
    #[error("invalid chunk list: {reason}")]
    InvalidChunks {
        /// Which structural rule was broken.
        reason: String,
    },

    /// An argument failed validation.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// Which argument and why.
        reason: String,
    },

    /// A serial-number reset targeted a sequence this process has never
    /// allocated from, so its chunk layout is unknown.
    #[error("no serial number is tracked for {table}.{column} [{chunks}]")]
    UntrackedSequence {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// Chunk names joined with `,`.
        chunks: String,
    },

    /// An ID counter was registered for a key that already has one.
    #[error("an ID counter is already tracked for {table}.{column}")]
    AlreadyTracked {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// The operation failed because a lock was **poisoned**.
    ///
    /// This occurs when a thread panics while holding the lock. When the
    /// `parking-lot` feature is enabled, locks do **not** poison, so this
    /// variant is not available.
    #[cfg_attr(docsrs, doc(cfg(not(feature = "parking-lot"))))]
    #[cfg(not(feature = "parking-lot"))]
    #[error("lock poisoned")]
    LockPoisoned,
}

impl Error {
    pub(crate) fn syntax(format: &str, reason: impl fmt::Display) -> Self {
        Self::FormatSyntax {
            format: format.to_owned(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn invalid_chunks(reason: impl fmt::Display) -> Self {
        Self::InvalidChunks {
            reason: reason.to_string(),
        }
    }

    pub(crate) fn invalid_argument(reason: impl fmt::Display) -> Self {
        Self::InvalidArgument {
            reason: reason.to_string(),
        }
    }
}

#[cfg_attr(docsrs, doc(cfg(not(feature = "parking-lot"))))]
#[cfg(not(feature = "parking-lot"))]
// Convert all poisoned lock errors to a simplified `LockPoisoned`
impl<G> From<crate::mutex::PoisonError<G>> for Error {
    fn from(_: crate::mutex::PoisonError<G>) -> Self {
        Self::LockPoisoned
    }
}
