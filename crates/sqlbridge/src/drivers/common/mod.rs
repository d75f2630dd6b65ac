//! Utilities shared across the driver implementations.
//!
//! - [`Handle`]: the single engine handle each raw connection owns

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};

use crate::error::{DbError, Result};

/// One engine handle, opened eagerly or on first use, closable once.
///
/// The mutex serializes access to the handle; [`Connection`](crate::Connection)
/// rejects overlapping calls before they ever wait on it.
pub(crate) struct Handle<H> {
    slot: Mutex<Option<H>>,
    closed: AtomicBool,
    engine: &'static str,
}

impl<H> Handle<H> {
    /// A handle that is already open.
    pub(crate) fn open(handle: H, engine: &'static str) -> Self {
        Self {
            slot: Mutex::new(Some(handle)),
            closed: AtomicBool::new(false),
            engine,
        }
    }

    /// A handle that opens on first use.
    pub(crate) fn lazy(engine: &'static str) -> Self {
        Self {
            slot: Mutex::new(None),
            closed: AtomicBool::new(false),
            engine,
        }
    }

    /// Lock the handle, opening it with `connect` if it has not been opened yet.
    pub(crate) async fn acquire<F, Fut>(&self, connect: F) -> Result<MappedMutexGuard<'_, H>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<H>>,
    {
        if self.closed.load(Ordering::Acquire) {
            return Err(self.not_open());
        }

        let mut guard = self.slot.lock().await;
        // `take` may have run while this call waited for the lock.
        if self.closed.load(Ordering::Acquire) {
            return Err(self.not_open());
        }
        if guard.is_none() {
            *guard = Some(connect().await?);
        }
        MutexGuard::try_map(guard, Option::as_mut).map_err(|_| self.not_open())
    }

    /// Whether the handle can still be used.
    pub(crate) fn is_open(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }

    /// Mark the handle closed and hand it back for a graceful shutdown.
    pub(crate) async fn take(&self) -> Option<H> {
        self.closed.store(true, Ordering::Release);
        self.slot.lock().await.take()
    }

    fn not_open(&self) -> DbError {
        DbError::connection(
            format!("{} handle is not open", self.engine),
            "acquiring connection handle",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lazy_handle_opens_once() {
        let handle: Handle<u32> = Handle::lazy("test");
        {
            let guard = handle.acquire(|| async { Ok(7) }).await.unwrap();
            assert_eq!(*guard, 7);
        }
        let guard = handle
            .acquire(|| async { Err(DbError::connection("should not reconnect", "test")) })
            .await
            .unwrap();
        assert_eq!(*guard, 7);
    }

    #[tokio::test]
    async fn test_closed_handle_is_rejected() {
        let handle = Handle::open(1u32, "test");
        assert!(handle.is_open());
        assert_eq!(handle.take().await, Some(1));
        assert!(!handle.is_open());

        let err = handle.acquire(|| async { Ok(2) }).await.unwrap_err();
        assert!(err.is_connection_error());
    }

    #[tokio::test]
    async fn test_failed_open_leaves_handle_lazy() {
        let handle: Handle<u32> = Handle::lazy("test");
        assert!(handle
            .acquire(|| async { Err(DbError::connection("refused", "test")) })
            .await
            .is_err());
        let guard = handle.acquire(|| async { Ok(3) }).await.unwrap();
        assert_eq!(*guard, 3);
    }

    #[tokio::test]
    async fn test_close_while_waiting_does_not_reopen() {
        let handle: Handle<u32> = Handle::lazy("test");
        let held = handle.acquire(|| async { Ok(1) }).await.unwrap();

        let (waiting, taken, ()) = tokio::join!(
            handle.acquire(|| async { Ok(2) }),
            handle.take(),
            async {
                tokio::task::yield_now().await;
                drop(held);
            }
        );
        assert!(waiting.unwrap_err().is_connection_error());
        assert_eq!(taken, Some(1));
        assert!(!handle.is_open());
    }
}
