use core::fmt;
use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::{chunk::DatePattern, error::Result};

/// When a `SerialNo` counter restarts from its `start` value.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum CycleModel {
    /// Restart whenever the calendar day changes.
    #[default]
    Day,
    /// Restart whenever the calendar month changes.
    Month,
    /// Restart whenever the year changes.
    Year,
    /// Restart at the top of every hour.
    Hour,
    /// Restart at the top of every minute.
    Minute,
    /// Never restart automatically.
    None,
}

impl CycleModel {
    /// Looks up a cycle model by its keyword (`day`, `month`, `year`, `hour`,
    /// `minute`, `none`). Keywords are case-sensitive.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "day" => Some(Self::Day),
            "month" => Some(Self::Month),
            "year" => Some(Self::Year),
            "hour" => Some(Self::Hour),
            "minute" => Some(Self::Minute),
            "none" => Some(Self::None),
            _ => None,
        }
    }

    /// The keyword used for this model in format strings.
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Month => "month",
            Self::Year => "year",
            Self::Hour => "hour",
            Self::Minute => "minute",
            Self::None => "none",
        }
    }

    /// Label of the time bucket `now` falls into. Two instants share a label
    /// iff no boundary of this model lies between them. [`CycleModel::None`]
    /// maps everything to the empty label.
    pub fn bucket(self, now: &NaiveDateTime) -> String {
        let pattern = match self {
            Self::Day => "%Y%m%d",
            Self::Month => "%Y%m",
            Self::Year => "%Y",
            Self::Hour => "%Y%m%d%H",
            Self::Minute => "%Y%m%d%H%M",
            Self::None => return String::new(),
        };
        now.format(pattern).to_string()
    }
}

impl fmt::Display for CycleModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// The parsed, immutable description of one chunk of a serial number.
///
/// Produced by [`parse`](crate::parse) and never mutated afterwards, so a
/// spec can be shared across threads and reused for every allocation.
///
/// Its [`Display`](fmt::Display) output is the canonical format string, with
/// every defaulted parameter spelled out.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type"))]
pub enum ChunkSpec {
    /// `SerialNo[start,incr,len,end,cyclemodel][varlen]`
    SerialNo {
        /// First value, and the value after every cycle reset.
        start: i64,
        /// Step between consecutive values. Always positive.
        increment: i64,
        /// Zero-padded width. `None` only when `variable_width` is set.
        width: Option<usize>,
        /// Inclusive upper bound, `None` for unbounded.
        end: Option<i64>,
        /// Reset rule used when no `DateTime` chunk is `[incycle]`.
        cycle: CycleModel,
        /// Render without padding or overflow checks. Only legal on the last
        /// chunk of a sequence.
        variable_width: bool,
    },
    /// `Text[value][len]`
    Text {
        /// Literal content.
        literal: String,
        /// Declared width; must equal the literal's length at render time.
        width: usize,
    },
    /// `DateTime[pattern][len][incycle]`
    DateTime {
        /// Date/time template applied to the current time.
        pattern: DatePattern,
        /// Declared width; must equal the rendered length.
        width: usize,
        /// Whether a change in this chunk's rendered text resets the serial
        /// counter.
        in_cycle: bool,
    },
}

impl ChunkSpec {
    /// Returns `true` for the `SerialNo` variant.
    pub const fn is_serial(&self) -> bool {
        matches!(self, Self::SerialNo { .. })
    }

    /// Returns `true` for a `SerialNo` chunk tagged `[varlen]`.
    pub const fn is_variable_width(&self) -> bool {
        matches!(
            self,
            Self::SerialNo {
                variable_width: true,
                ..
            }
        )
    }

    /// Returns `true` for a `DateTime` chunk tagged `[incycle]`.
    pub const fn is_in_cycle(&self) -> bool {
        matches!(self, Self::DateTime { in_cycle: true, .. })
    }
}

impl fmt::Display for ChunkSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SerialNo {
                start,
                increment,
                width,
                end,
                cycle,
                variable_width,
            } => {
                write!(f, "SerialNo[{start},{increment},")?;
                if let Some(width) = width {
                    write!(f, "{width}")?;
                }
                f.write_str(",")?;
                if let Some(end) = end {
                    write!(f, "{end}")?;
                }
                write!(f, ",{cycle}]")?;
                if *variable_width {
                    f.write_str("[varlen]")?;
                }
                Ok(())
            }
            Self::Text { literal, width } => write!(f, "Text[{literal}][{width}]"),
            Self::DateTime {
                pattern,
                width,
                in_cycle,
            } => {
                write!(f, "DateTime[{pattern}][{width}]")?;
                if *in_cycle {
                    f.write_str("[incycle]")?;
                }
                Ok(())
            }
        }
    }
}

/// A named chunk: one segment of a composite serial number.
///
/// The name is part of the sequence identity. Two chunk lists address the
/// same counter iff their names are equal element-wise, whatever their
/// formats say.
///
/// # Example
///
/// ```
/// use seqid::SerialChunk;
///
/// let chunks = [
///     SerialChunk::new("FLOWNO", "Text[FLOWNO][6]")?,
///     SerialChunk::new("DateTime", "DateTime[yyyyMMdd][8][incycle]")?,
///     SerialChunk::new("SerialNo", "SerialNo[1,1,6,,day]")?,
/// ];
/// assert!(chunks[2].spec().is_serial());
/// # Ok::<(), seqid::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialChunk {
    name: String,
    spec: Arc<ChunkSpec>,
}

impl SerialChunk {
    /// Parses `format` and pairs it with `name`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::FormatSyntax`] if `format` is malformed.
    pub fn new(name: impl Into<String>, format: &str) -> Result<Self> {
        Ok(Self::from_spec(name, crate::chunk::parse(format)?))
    }

    /// Pairs an already parsed spec with `name`.
    pub fn from_spec(name: impl Into<String>, spec: impl Into<Arc<ChunkSpec>>) -> Self {
        Self {
            name: name.into(),
            spec: spec.into(),
        }
    }

    /// The chunk's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The chunk's parsed format.
    pub fn spec(&self) -> &ChunkSpec {
        &self.spec
    }

    /// Whether both chunks point at the same parsed spec allocation.
    pub(crate) fn shares_spec(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.spec, &other.spec)
    }
}
