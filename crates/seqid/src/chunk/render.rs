use chrono::NaiveDateTime;

use crate::{
    chunk::{ChunkSpec, CycleModel, SerialChunk},
    error::{Error, Result},
};

/// Separates the texts of several `[incycle]` chunks inside one anchor.
const ANCHOR_SEPARATOR: char = '\u{1f}';

/// The evolving state of one serial-number sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialState {
    /// Last value handed out by the `SerialNo` chunk.
    pub current: i64,
    /// Cycle anchor observed by the last render. A different anchor on the
    /// next render means a cycle boundary was crossed.
    pub anchor: String,
}

/// The outcome of rendering a whole sequence once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// The assembled serial number.
    pub text: String,
    /// State to commit if the caller accepts this value.
    pub state: SerialState,
    /// Whether this render restarted the counter.
    pub cycled: bool,
}

/// The stored values a sequence may resume from. See
/// [`ChunkLayout::resume_prefix`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumePrefix {
    /// Text that every value of the current cycle starts with.
    pub text: String,
    /// `true` if `text` covers every chunk before a fixed-width `SerialNo`
    /// chunk. The greatest fitting value (longest, then highest) then
    /// carries the greatest counter. Otherwise each match has to be
    /// decomposed.
    pub ordered: bool,
}

/// The `SerialNo` parameters, copied out of its [`ChunkSpec`].
#[derive(Debug, Clone, Copy)]
struct Serial<'a> {
    name: &'a str,
    start: i64,
    increment: i64,
    width: Option<usize>,
    end: Option<i64>,
    cycle: CycleModel,
    variable_width: bool,
}

/// A chunk list that has passed structural validation.
///
/// A valid list is non-empty, contains exactly one `SerialNo` chunk, and only
/// its last chunk may be `[varlen]`.
#[derive(Debug, Clone, Copy)]
pub struct ChunkLayout<'a> {
    chunks: &'a [SerialChunk],
    serial_at: usize,
    serial: Serial<'a>,
}

impl<'a> ChunkLayout<'a> {
    /// Validates `chunks`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidChunks`] if the list is empty, does not hold
    /// exactly one `SerialNo` chunk, or has `[varlen]` before the last chunk.
    pub fn new(chunks: &'a [SerialChunk]) -> Result<Self> {
        if chunks.is_empty() {
            return Err(Error::invalid_chunks("a serial number needs at least one chunk"));
        }

        let mut found = None;
        for (i, chunk) in chunks.iter().enumerate() {
            if chunk.spec().is_variable_width() && i + 1 != chunks.len() {
                return Err(Error::invalid_chunks(format!(
                    "chunk `{}` is `[varlen]` but only the last chunk may be",
                    chunk.name()
                )));
            }
            if let ChunkSpec::SerialNo {
                start,
                increment,
                width,
                end,
                cycle,
                variable_width,
            } = *chunk.spec()
            {
                let serial = Serial {
                    name: chunk.name(),
                    start,
                    increment,
                    width,
                    end,
                    cycle,
                    variable_width,
                };
                if found.replace((i, serial)).is_some() {
                    return Err(Error::invalid_chunks("only one `SerialNo` chunk is allowed"));
                }
            }
        }

        let (serial_at, serial) =
            found.ok_or_else(|| Error::invalid_chunks("exactly one `SerialNo` chunk is required"))?;
        Ok(Self {
            chunks,
            serial_at,
            serial,
        })
    }

    /// The validated chunks.
    pub fn chunks(&self) -> &'a [SerialChunk] {
        self.chunks
    }

    fn has_in_cycle(&self) -> bool {
        self.chunks.iter().any(|c| c.spec().is_in_cycle())
    }

    /// Renders every chunk except the `SerialNo` one, which is left `None`.
    fn fixed_texts(&self, now: &NaiveDateTime) -> Result<Vec<Option<String>>> {
        self.chunks
            .iter()
            .map(|chunk| render_fixed(chunk, now))
            .collect()
    }

    fn anchor_or_bucket(&self, texts: &[Option<String>], now: &NaiveDateTime) -> String {
        if !self.has_in_cycle() {
            return self.serial.cycle.bucket(now);
        }

        let mut parts = self
            .chunks
            .iter()
            .zip(texts)
            .filter(|(chunk, _)| chunk.spec().is_in_cycle())
            .filter_map(|(_, text)| text.as_deref());
        let mut anchor = parts.next().unwrap_or_default().to_owned();
        for part in parts {
            anchor.push(ANCHOR_SEPARATOR);
            anchor.push_str(part);
        }
        anchor
    }

    /// Current cycle anchor: the joined texts of the `[incycle]` chunks, or
    /// the `SerialNo` chunk's own time bucket when there are none.
    ///
    /// # Errors
    ///
    /// Fails if a `Text` or `DateTime` chunk does not match its width.
    pub fn current_anchor(&self, now: &NaiveDateTime) -> Result<String> {
        let texts = self.fixed_texts(now)?;
        Ok(self.anchor_or_bucket(&texts, now))
    }

    /// State of a never-allocated sequence: positioned one step before
    /// `start`, in the current cycle, so the first render yields `start`.
    ///
    /// # Errors
    ///
    /// Fails if a `Text` or `DateTime` chunk does not match its width.
    pub fn initial_state(&self, now: &NaiveDateTime) -> Result<SerialState> {
        let serial = self.serial;
        Ok(SerialState {
            current: serial.start - serial.increment,
            anchor: self.current_anchor(now)?,
        })
    }

    /// Renders the next serial number after `state`.
    ///
    /// The counter restarts at `start` when the cycle anchor moved, and
    /// otherwise advances by `increment`. `state` itself is not touched; the
    /// caller commits [`Rendered::state`] once it accepts the value.
    ///
    /// # Errors
    ///
    /// - [`Error::ConfigurationMismatch`] if a `Text` or `DateTime` chunk
    ///   does not match its width.
    /// - [`Error::SequenceExhausted`] if the counter would pass `end`.
    /// - [`Error::SequenceOverflow`] if the counter no longer fits its width.
    pub fn render(&self, state: &SerialState, now: &NaiveDateTime) -> Result<Rendered> {
        let serial = self.serial;
        let texts = self.fixed_texts(now)?;
        let anchor = self.anchor_or_bucket(&texts, now);

        let cycled = anchor != state.anchor;
        let current = if cycled {
            serial.start
        } else {
            state
                .current
                .checked_add(serial.increment)
                .ok_or_else(|| Error::SequenceExhausted {
                    chunk: serial.name.to_owned(),
                    value: state.current,
                    end: i64::MAX,
                })?
        };

        if let Some(end) = serial.end {
            if current > end {
                return Err(Error::SequenceExhausted {
                    chunk: serial.name.to_owned(),
                    value: current,
                    end,
                });
            }
        }

        let digits = render_serial(
            serial.name,
            current,
            serial.width,
            serial.variable_width,
        )?;

        let mut text = String::new();
        for fixed in &texts {
            text.push_str(fixed.as_deref().unwrap_or(&digits));
        }

        Ok(Rendered {
            text,
            state: SerialState { current, anchor },
            cycled,
        })
    }

    /// Where to look for earlier values of the current cycle, or `None`
    /// when stored values cannot tell cycles apart.
    ///
    /// A cycle is recognizable when an `[incycle]` chunk precedes the
    /// `SerialNo` chunk (and none follows it), or when the model is
    /// [`CycleModel::None`]. The prefix is the rendered text of the leading
    /// chunks up to the first `DateTime` chunk that is not `[incycle]`;
    /// such a chunk varies within a cycle and cannot be part of it.
    /// Stored values may not fit the layout at all; callers decompose each
    /// candidate and skip those that fail.
    ///
    /// # Errors
    ///
    /// Fails if a `Text` or `DateTime` chunk does not match its width.
    pub fn resume_prefix(&self, now: &NaiveDateTime) -> Result<Option<ResumePrefix>> {
        let (before, after) = self.chunks.split_at(self.serial_at);
        if after.iter().any(|c| c.spec().is_in_cycle()) {
            return Ok(None);
        }
        let pinned = before.iter().any(|c| c.spec().is_in_cycle())
            || self.serial.cycle == CycleModel::None;
        if !pinned {
            return Ok(None);
        }

        let mut text = String::new();
        // leading zeros of older, wider values break length order
        let mut ordered = !self.serial.variable_width;
        for chunk in before {
            if let ChunkSpec::DateTime {
                in_cycle: false, ..
            } = chunk.spec()
            {
                ordered = false;
                break;
            }
            if let Some(rendered) = render_fixed(chunk, now)? {
                text.push_str(&rendered);
            }
        }
        Ok(Some(ResumePrefix { text, ordered }))
    }

    /// Splits a previously issued serial number back into counter state.
    ///
    /// `Text` chunks must match literally; `DateTime` chunks consume their
    /// declared width and, when `[incycle]`, become the anchor. Without any
    /// `[incycle]` chunk the anchor is the current time bucket.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `value` does not fit the layout.
    pub fn decompose(&self, value: &str, now: &NaiveDateTime) -> Result<SerialState> {
        let mismatch = |what: &str| {
            Error::invalid_argument(format!("`{value}` does not match the chunk layout: {what}"))
        };

        let mut rest = value;
        let mut texts = Vec::with_capacity(self.chunks.len());
        let mut current = None;

        for chunk in self.chunks {
            match chunk.spec() {
                ChunkSpec::Text { literal, .. } => {
                    rest = rest
                        .strip_prefix(literal.as_str())
                        .ok_or_else(|| mismatch(&format!("expected `{literal}`")))?;
                    texts.push(Some(literal.clone()));
                }
                ChunkSpec::DateTime { width, .. } => {
                    let (head, tail) = split_chars(rest, *width)
                        .ok_or_else(|| mismatch(&format!("`{}` is too short", chunk.name())))?;
                    texts.push(Some(head.to_owned()));
                    rest = tail;
                }
                ChunkSpec::SerialNo {
                    width,
                    variable_width,
                    ..
                } => {
                    let (digits, tail) = if *variable_width {
                        (rest, "")
                    } else {
                        split_chars(rest, width.unwrap_or_default())
                            .ok_or_else(|| mismatch(&format!("`{}` is too short", chunk.name())))?
                    };
                    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                        return Err(mismatch(&format!("`{digits}` is not a serial value")));
                    }
                    current = Some(
                        digits
                            .parse()
                            .map_err(|_| mismatch(&format!("`{digits}` is out of range")))?,
                    );
                    texts.push(None);
                    rest = tail;
                }
            }
        }

        if !rest.is_empty() {
            return Err(mismatch(&format!("unexpected trailing `{rest}`")));
        }

        let current = current.ok_or_else(|| mismatch("no serial chunk"))?;
        Ok(SerialState {
            current,
            anchor: self.anchor_or_bucket(&texts, now),
        })
    }
}

/// Renders a `Text` or `DateTime` chunk, checking its width. `SerialNo`
/// chunks yield `None`; their text depends on sequence state.
///
/// # Errors
///
/// Returns [`Error::ConfigurationMismatch`] when the rendered length differs
/// from the declared width.
pub fn render_fixed(chunk: &SerialChunk, now: &NaiveDateTime) -> Result<Option<String>> {
    let (rendered, width) = match chunk.spec() {
        ChunkSpec::Text { literal, width } => (literal.clone(), *width),
        ChunkSpec::DateTime { pattern, width, .. } => (pattern.format(now).to_string(), *width),
        ChunkSpec::SerialNo { .. } => return Ok(None),
    };

    if rendered.chars().count() == width {
        Ok(Some(rendered))
    } else {
        Err(Error::ConfigurationMismatch {
            chunk: chunk.name().to_owned(),
            rendered,
            width,
        })
    }
}

/// Renders a serial value, zero-padded to `width` unless `variable_width`.
///
/// # Errors
///
/// Returns [`Error::SequenceOverflow`] if a fixed-width value needs more
/// than `width` digits.
pub fn render_serial(
    name: &str,
    value: i64,
    width: Option<usize>,
    variable_width: bool,
) -> Result<String> {
    let digits = value.to_string();
    if variable_width {
        return Ok(digits);
    }

    let width = width.unwrap_or_default();
    if digits.len() > width {
        return Err(Error::SequenceOverflow {
            chunk: name.to_owned(),
            value,
            width,
        });
    }
    Ok(format!("{value:0width$}"))
}

fn split_chars(s: &str, n: usize) -> Option<(&str, &str)> {
    match s.char_indices().nth(n) {
        Some((at, _)) => Some(s.split_at(at)),
        None if s.chars().count() == n => Some((s, "")),
        None => None,
    }
}
