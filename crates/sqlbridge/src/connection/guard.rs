//! Fail-fast re-entrancy guard.
//!
//! A [`Connection`](super::Connection) owns one engine handle, so operations on
//! it must not overlap. Instead of queueing a second caller behind the first,
//! the guard rejects it with [`DbError::Busy`].

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{DbError, Result};

/// Tracks whether an operation is in flight.
#[derive(Debug, Default)]
pub(crate) struct ReentrancyGuard {
    busy: AtomicBool,
}

/// Held for the duration of one operation; releases the guard on drop,
/// including when the operation's future is cancelled.
#[derive(Debug)]
pub(crate) struct InFlight<'a> {
    busy: &'a AtomicBool,
}

impl ReentrancyGuard {
    /// Mark an operation as started, or fail if one already is.
    pub(crate) fn enter(&self) -> Result<InFlight<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| DbError::Busy)?;
        Ok(InFlight { busy: &self.busy })
    }

    /// Whether an operation is currently in flight.
    #[cfg(test)]
    pub(crate) fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_enter_is_busy() {
        let guard = ReentrancyGuard::default();
        let first = guard.enter().unwrap();
        assert!(guard.is_busy());
        assert!(matches!(guard.enter().unwrap_err(), DbError::Busy));
        drop(first);
        assert!(!guard.is_busy());
        assert!(guard.enter().is_ok());
    }
}
