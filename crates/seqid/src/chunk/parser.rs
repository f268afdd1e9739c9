use core::str::FromStr;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    chunk::{ChunkSpec, CycleModel, DatePattern},
    error::{Error, Result},
};

const DEFAULT_START: i64 = 1;
const DEFAULT_INCREMENT: i64 = 1;

/// Parses one chunk format string into a [`ChunkSpec`].
///
/// Three shapes are recognized, matched literally and case-sensitively:
///
/// - `SerialNo[start,incr,len,end,cyclemodel]` optionally followed by
///   `[varlen]`. Every parameter may be left empty: `start` and `incr`
///   default to `1`, `end` to unbounded and `cyclemodel` to `day`. `len` may
///   only be empty when `[varlen]` is present.
/// - `Text[value][len]`
/// - `DateTime[pattern][len]` optionally followed by `[incycle]`.
///
/// Nothing else is tolerated: a stray space anywhere is an error, so equal
/// chunks always have byte-identical format strings.
///
/// # Errors
///
/// Returns [`Error::FormatSyntax`] describing the first problem found.
///
/// # Example
///
/// ```
/// use seqid::{ChunkSpec, CycleModel, parse};
///
/// let spec = parse("SerialNo[,,5,,]")?;
/// assert_eq!(
///     spec,
///     ChunkSpec::SerialNo {
///         start: 1,
///         increment: 1,
///         width: Some(5),
///         end: None,
///         cycle: CycleModel::Day,
///         variable_width: false,
///     }
/// );
/// assert!(parse("Text[FLOWNO] [6]").is_err());
/// # Ok::<(), seqid::Error>(())
/// ```
#[cfg_attr(feature = "tracing", instrument(level = "trace", err))]
pub fn parse(format: &str) -> Result<ChunkSpec> {
    if let Some(rest) = format.strip_prefix("SerialNo") {
        parse_serial(&mut Cursor::new(format, rest))
    } else if let Some(rest) = format.strip_prefix("Text") {
        parse_text(&mut Cursor::new(format, rest))
    } else if let Some(rest) = format.strip_prefix("DateTime") {
        parse_datetime(&mut Cursor::new(format, rest))
    } else {
        Err(Error::syntax(
            format,
            "expected `SerialNo[..]`, `Text[..][..]` or `DateTime[..][..]`",
        ))
    }
}

impl FromStr for ChunkSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse(s)
    }
}

fn parse_serial(cursor: &mut Cursor<'_>) -> Result<ChunkSpec> {
    let params = cursor.group()?;
    let [start, increment, width, end, cycle] = split_params(params)
        .ok_or_else(|| cursor.error("`SerialNo` takes exactly five comma-separated parameters"))?;
    let variable_width = cursor.optional_tag("varlen")?;
    cursor.finish()?;

    let start = cursor.optional_number(start)?.unwrap_or(DEFAULT_START);
    let increment = cursor.optional_number(increment)?.unwrap_or(DEFAULT_INCREMENT);
    let width = cursor.optional_number(width)?;
    let end = cursor.optional_number(end)?;
    let cycle = if cycle.is_empty() {
        CycleModel::default()
    } else {
        CycleModel::from_keyword(cycle).ok_or_else(|| {
            cursor.error(format!(
                "unknown cycle model `{cycle}`, expected one of day, month, year, hour, minute, none"
            ))
        })?
    };

    if increment == 0 {
        return Err(cursor.error("increment must be positive"));
    }
    if !variable_width {
        match width {
            None => return Err(cursor.error("len is required unless `[varlen]` is given")),
            Some(0) => return Err(cursor.error("len must be positive")),
            Some(_) => {}
        }
    }
    if end.is_some_and(|end| start > end) {
        return Err(cursor.error("start exceeds end"));
    }

    Ok(ChunkSpec::SerialNo {
        start,
        increment,
        width: width.map(to_width),
        end,
        cycle,
        variable_width,
    })
}

fn parse_text(cursor: &mut Cursor<'_>) -> Result<ChunkSpec> {
    let literal = cursor.group()?;
    if literal.is_empty() {
        return Err(cursor.error("`Text` value must not be empty"));
    }
    let width = cursor.required_width()?;
    cursor.finish()?;

    Ok(ChunkSpec::Text {
        literal: literal.to_owned(),
        width,
    })
}

fn parse_datetime(cursor: &mut Cursor<'_>) -> Result<ChunkSpec> {
    let pattern = cursor.group()?;
    if pattern.is_empty() {
        return Err(cursor.error("`DateTime` pattern must not be empty"));
    }
    let pattern = DatePattern::compile(pattern).map_err(|reason| cursor.error(reason))?;
    let width = cursor.required_width()?;
    let in_cycle = cursor.optional_tag("incycle")?;
    cursor.finish()?;

    Ok(ChunkSpec::DateTime {
        pattern,
        width,
        in_cycle,
    })
}

fn split_params(params: &str) -> Option<[&str; 5]> {
    let mut parts = params.split(',');
    let fields = [
        parts.next()?,
        parts.next()?,
        parts.next()?,
        parts.next()?,
        parts.next()?,
    ];
    parts.next().is_none().then_some(fields)
}

fn to_width(n: i64) -> usize {
    // digit-only input is never negative
    usize::try_from(n).unwrap_or(usize::MAX)
}

/// Walks the bracketed groups that follow a chunk keyword.
struct Cursor<'a> {
    format: &'a str,
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(format: &'a str, rest: &'a str) -> Self {
        Self { format, rest }
    }

    fn error(&self, reason: impl core::fmt::Display) -> Error {
        Error::syntax(self.format, reason)
    }

    /// Consumes `[...]` and returns what is inside.
    fn group(&mut self) -> Result<&'a str> {
        let body = self
            .rest
            .strip_prefix('[')
            .ok_or_else(|| self.error(format!("expected `[` at `{}`", self.rest)))?;
        let close = body
            .find(']')
            .ok_or_else(|| self.error("missing closing `]`"))?;
        self.rest = &body[close + 1..];
        Ok(&body[..close])
    }

    /// Consumes a trailing `[tag]` if one is present.
    fn optional_tag(&mut self, tag: &str) -> Result<bool> {
        if self.rest.is_empty() {
            return Ok(false);
        }
        let found = self.group()?;
        if found == tag {
            Ok(true)
        } else {
            Err(self.error(format!("expected `[{tag}]`, found `[{found}]`")))
        }
    }

    fn required_width(&mut self) -> Result<usize> {
        let raw = self.group()?;
        self.optional_number(raw)?
            .map(to_width)
            .ok_or_else(|| self.error("len is required"))
    }

    fn optional_number(&self, raw: &str) -> Result<Option<i64>> {
        if raw.is_empty() {
            return Ok(None);
        }
        if !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(self.error(format!("`{raw}` is not a non-negative integer")));
        }
        raw.parse()
            .map(Some)
            .map_err(|_| self.error(format!("`{raw}` is out of range")))
    }

    fn finish(&self) -> Result<()> {
        if self.rest.is_empty() {
            Ok(())
        } else {
            Err(self.error(format!("unexpected trailing `{}`", self.rest)))
        }
    }
}
