use core::fmt;

use crate::{
    chunk::SerialChunk,
    error::{Error, Result},
};

/// Anything that names a chunk. Only names take part in sequence identity,
/// so resets and lookups can be addressed with bare names.
pub trait ChunkName {
    /// The chunk's name.
    fn chunk_name(&self) -> &str;
}

impl ChunkName for SerialChunk {
    fn chunk_name(&self) -> &str {
        self.name()
    }
}

impl ChunkName for str {
    fn chunk_name(&self) -> &str {
        self
    }
}

impl ChunkName for String {
    fn chunk_name(&self) -> &str {
        self
    }
}

impl<C: ChunkName + ?Sized> ChunkName for &C {
    fn chunk_name(&self) -> &str {
        (**self).chunk_name()
    }
}

fn required(what: &str, value: &str) -> Result<String> {
    if value.is_empty() {
        Err(Error::invalid_argument(format!("{what} must not be empty")))
    } else {
        Ok(value.to_owned())
    }
}

/// Identifies one plain integer ID counter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdKey {
    table: String,
    column: String,
}

impl IdKey {
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if either name is empty.
    pub fn new(table: &str, column: &str) -> Result<Self> {
        Ok(Self {
            table: required("table name", table)?,
            column: required("column name", column)?,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub(crate) fn matches(&self, table: Option<&str>, column: Option<&str>) -> bool {
        table.is_none_or(|t| t == self.table) && column.is_none_or(|c| c == self.column)
    }
}

impl fmt::Display for IdKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

/// Identifies one serial-number counter: a table, a column and the ordered
/// chunk names.
///
/// Renaming or reordering chunks yields a different key even when the table
/// and column match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SnoKey {
    table: String,
    column: String,
    chunks: Vec<String>,
}

impl SnoKey {
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if a name is empty or `chunks` is
    /// empty.
    pub fn new<C: ChunkName>(table: &str, column: &str, chunks: &[C]) -> Result<Self> {
        if chunks.is_empty() {
            return Err(Error::invalid_argument("chunk list must not be empty"));
        }
        Ok(Self {
            table: required("table name", table)?,
            column: required("column name", column)?,
            chunks: chunks
                .iter()
                .map(|c| required("chunk name", c.chunk_name()))
                .collect::<Result<_>>()?,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    /// The ordered chunk names.
    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    /// The chunk names joined with `,`.
    pub fn chunk_key(&self) -> String {
        self.chunks.join(",")
    }

    pub(crate) fn matches<C: ChunkName>(
        &self,
        table: Option<&str>,
        column: Option<&str>,
        chunks: Option<&[C]>,
    ) -> bool {
        table.is_none_or(|t| t == self.table)
            && column.is_none_or(|c| c == self.column)
            && chunks.is_none_or(|names| {
                names.len() == self.chunks.len()
                    && names
                        .iter()
                        .zip(&self.chunks)
                        .all(|(a, b)| a.chunk_name() == b)
            })
    }
}

impl fmt::Display for SnoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} [{}]", self.table, self.column, self.chunk_key())
    }
}
