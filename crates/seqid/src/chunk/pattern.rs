use core::{fmt, str::FromStr};

use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::error::{Error, Result};

/// One compiled piece of a [`DatePattern`]. The `u8` is the run length of
/// the specifier letter, e.g. `yyyy` is `Year(4)`.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Item {
    Literal(String),
    Year(u8),
    Month(u8),
    Day(u8),
    Hour24(u8),
    Hour12(u8),
    Minute(u8),
    Second(u8),
    Fraction(u8),
    Meridiem(u8),
}

const MAX_FRACTION_DIGITS: u8 = 7;

/// A compiled date/time template such as `yyyyMMdd` or `yyyy-MM-dd HH:mm`.
///
/// Specifiers are runs of one letter:
///
/// | run                 | output                                   |
/// |---------------------|------------------------------------------|
/// | `y` / `yy`          | year within century, unpadded / 2 digits |
/// | `yyy`, `yyyy`, ...  | full year, zero-padded to the run length |
/// | `M` / `MM`          | month, unpadded / 2 digits               |
/// | `MMM` / `MMMM`      | abbreviated / full month name            |
/// | `d` / `dd`          | day of month, unpadded / 2 digits        |
/// | `ddd` / `dddd`      | abbreviated / full weekday name          |
/// | `H` / `HH`          | hour 0-23                                |
/// | `h` / `hh`          | hour 1-12                                |
/// | `m` / `mm`          | minute                                   |
/// | `s` / `ss`          | second                                   |
/// | `f` ... `fffffff`   | fraction of a second, truncated          |
/// | `t` / `tt`          | `A`/`P`, `AM`/`PM`                       |
///
/// Text inside `'single'` or `"double"` quotes and any character after `\`
/// is copied verbatim; a `%` is ignored. Every other character is literal.
#[derive(Clone)]
pub struct DatePattern {
    source: String,
    items: Vec<Item>,
}

impl DatePattern {
    /// Compiles `source`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FormatSyntax`] for an unterminated quote, a dangling
    /// `\`, or more than seven `f`s.
    pub fn new(source: &str) -> Result<Self> {
        Self::compile(source).map_err(|reason| Error::syntax(source, reason))
    }

    pub(crate) fn compile(source: &str) -> core::result::Result<Self, &'static str> {
        let mut items = Vec::new();
        let mut chars = source.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                'y' | 'M' | 'd' | 'H' | 'h' | 'm' | 's' | 'f' | 't' => {
                    let mut run: u8 = 1;
                    while chars.peek() == Some(&c) {
                        chars.next();
                        run = run.saturating_add(1);
                    }
                    items.push(match c {
                        'y' => Item::Year(run),
                        'M' => Item::Month(run.min(4)),
                        'd' => Item::Day(run.min(4)),
                        'H' => Item::Hour24(run.min(2)),
                        'h' => Item::Hour12(run.min(2)),
                        'm' => Item::Minute(run.min(2)),
                        's' => Item::Second(run.min(2)),
                        'f' if run > MAX_FRACTION_DIGITS => {
                            return Err("at most seven `f` fraction digits are supported");
                        }
                        'f' => Item::Fraction(run),
                        _ => Item::Meridiem(run.min(2)),
                    });
                }
                '\'' | '"' => {
                    let mut quoted = String::new();
                    loop {
                        match chars.next() {
                            Some(q) if q == c => break,
                            Some(q) => quoted.push(q),
                            None => return Err("unterminated quoted text in date pattern"),
                        }
                    }
                    push_literal(&mut items, &quoted);
                }
                '\\' => match chars.next() {
                    Some(escaped) => push_literal(&mut items, escaped.encode_utf8(&mut [0; 4])),
                    None => return Err("dangling `\\` at end of date pattern"),
                },
                '%' => {}
                other => push_literal(&mut items, other.encode_utf8(&mut [0; 4])),
            }
        }

        Ok(Self {
            source: source.to_owned(),
            items,
        })
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns a value that renders `at` through this pattern when
    /// displayed.
    ///
    /// # Example
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use seqid::DatePattern;
    ///
    /// let at = NaiveDate::from_ymd_opt(2016, 2, 3)
    ///     .and_then(|d| d.and_hms_opt(14, 5, 9))
    ///     .unwrap();
    /// let pattern = DatePattern::new("yyyy-MM-dd hh:mm tt")?;
    /// assert_eq!(pattern.format(&at).to_string(), "2016-02-03 02:05 PM");
    /// # Ok::<(), seqid::Error>(())
    /// ```
    pub fn format<'a>(&'a self, at: &'a NaiveDateTime) -> FormattedDate<'a> {
        FormattedDate { pattern: self, at }
    }
}

fn push_literal(items: &mut Vec<Item>, text: &str) {
    if let Some(Item::Literal(last)) = items.last_mut() {
        last.push_str(text);
    } else if !text.is_empty() {
        items.push(Item::Literal(text.to_owned()));
    }
}

impl PartialEq for DatePattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for DatePattern {}

impl fmt::Debug for DatePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DatePattern").field(&self.source).finish()
    }
}

impl fmt::Display for DatePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for DatePattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for DatePattern {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for DatePattern {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> core::result::Result<Self, D::Error> {
        let source = <String as serde::Deserialize>::deserialize(deserializer)?;
        Self::new(&source).map_err(serde::de::Error::custom)
    }
}

/// A [`DatePattern`] applied to an instant. See [`DatePattern::format`].
pub struct FormattedDate<'a> {
    pattern: &'a DatePattern,
    at: &'a NaiveDateTime,
}

impl fmt::Display for FormattedDate<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let at = self.at;
        for item in &self.pattern.items {
            match *item {
                Item::Literal(ref text) => f.write_str(text)?,
                Item::Year(1) => write!(f, "{}", at.year().rem_euclid(100))?,
                Item::Year(2) => write!(f, "{:02}", at.year().rem_euclid(100))?,
                Item::Year(n) => write!(f, "{:0width$}", at.year(), width = usize::from(n))?,
                Item::Month(1) => write!(f, "{}", at.month())?,
                Item::Month(2) => write!(f, "{:02}", at.month())?,
                Item::Month(3) => write!(f, "{}", at.format("%b"))?,
                Item::Month(_) => write!(f, "{}", at.format("%B"))?,
                Item::Day(1) => write!(f, "{}", at.day())?,
                Item::Day(2) => write!(f, "{:02}", at.day())?,
                Item::Day(3) => write!(f, "{}", at.format("%a"))?,
                Item::Day(_) => write!(f, "{}", at.format("%A"))?,
                Item::Hour24(1) => write!(f, "{}", at.hour())?,
                Item::Hour24(_) => write!(f, "{:02}", at.hour())?,
                Item::Hour12(1) => write!(f, "{}", at.hour12().1)?,
                Item::Hour12(_) => write!(f, "{:02}", at.hour12().1)?,
                Item::Minute(1) => write!(f, "{}", at.minute())?,
                Item::Minute(_) => write!(f, "{:02}", at.minute())?,
                Item::Second(1) => write!(f, "{}", at.second())?,
                Item::Second(_) => write!(f, "{:02}", at.second())?,
                Item::Fraction(n) => {
                    // leap seconds are reported as nanos >= 1e9
                    let nanos = at.nanosecond() % 1_000_000_000;
                    let digits = u32::from(n);
                    let value = nanos / 10u32.pow(9 - digits);
                    write!(f, "{value:0width$}", width = usize::from(n))?;
                }
                Item::Meridiem(n) => {
                    let label = if at.hour12().0 { "PM" } else { "AM" };
                    f.write_str(if n == 1 { &label[..1] } else { label })?;
                }
            }
        }
        Ok(())
    }
}
