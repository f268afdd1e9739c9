use std::sync::Arc;

use chrono::NaiveDateTime;

/// A trait for time sources that return the current local wall-clock time.
///
/// `DateTime` chunks are rendered against this value and cycle boundaries
/// (`day`, `month`, ...) are derived from it. Plug in [`LocalClock`] for real
/// use, or a mocked time source in tests.
///
/// # Example
///
/// ```
/// use chrono::{NaiveDate, NaiveDateTime};
/// use seqid::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn now(&self) -> NaiveDateTime {
///         NaiveDate::from_ymd_opt(2016, 2, 3)
///             .and_then(|d| d.and_hms_opt(9, 30, 0))
///             .unwrap()
///     }
/// }
///
/// assert_eq!(FixedTime.now().format("%Y%m%d").to_string(), "20160203");
/// ```
///
/// [`LocalClock`]: crate::LocalClock
pub trait TimeSource {
    /// Returns the current local date and time.
    fn now(&self) -> NaiveDateTime;
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn now(&self) -> NaiveDateTime {
        (**self).now()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for Arc<T> {
    fn now(&self) -> NaiveDateTime {
        (**self).now()
    }
}
