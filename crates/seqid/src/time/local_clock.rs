use chrono::{Local, NaiveDateTime};

use crate::time::TimeSource;

/// The host's local wall clock.
///
/// Serial numbers are business document numbers, so dates embedded in them
/// follow the local calendar rather than UTC.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalClock;

impl TimeSource for LocalClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}
