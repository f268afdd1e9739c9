#[cfg(feature = "parking-lot")]
pub use parking_lot::{Mutex, RwLock};
#[cfg(not(feature = "parking-lot"))]
pub use std::sync::{Mutex, PoisonError, RwLock};

/// Acquires a [`Mutex`], mapping poisoning to [`crate::Error::LockPoisoned`]
/// when the std lock is in use.
macro_rules! lock {
    ($m:expr) => {{
        #[cfg(feature = "parking-lot")]
        let guard = $m.lock();
        #[cfg(not(feature = "parking-lot"))]
        let guard = $m.lock()?;
        guard
    }};
}

/// Read-locks a [`RwLock`].
macro_rules! read_lock {
    ($m:expr) => {{
        #[cfg(feature = "parking-lot")]
        let guard = $m.read();
        #[cfg(not(feature = "parking-lot"))]
        let guard = $m.read()?;
        guard
    }};
}

/// Write-locks a [`RwLock`].
macro_rules! write_lock {
    ($m:expr) => {{
        #[cfg(feature = "parking-lot")]
        let guard = $m.write();
        #[cfg(not(feature = "parking-lot"))]
        let guard = $m.write()?;
        guard
    }};
}

pub(crate) use {lock, read_lock, write_lock};
