//! The single logical thread of control shared by a manager and its handles.
//!
//! A browser runs WebSocket callbacks and page code on one event loop, so a
//! handler can never run while `subscribe` is half-way through swapping it
//! out.  Here the transport driver tasks run on a multi-threaded tokio
//! runtime, so the same guarantee is made explicit: every manager operation
//! and every message dispatch enters a *turn* on a shared [`Dispatcher`]
//! before it touches listener state.
//!
//! Turns are reentrant on the same thread.  A handler that calls back into
//! the manager (for example to unsubscribe itself after the first message)
//! enters a nested turn instead of deadlocking.
//!
//! A turn guard is `!Send` and must never be held across an `.await`.

use std::sync::Arc;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

/// Shared reentrant lock serialising manager calls and event dispatch.
///
/// Cloning is cheap and yields a handle to the same lock.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    lock: Arc<ReentrantMutex<()>>,
}

/// Proof that the current thread holds a turn.  Dropping it ends the turn.
pub type Turn<'a> = ReentrantMutexGuard<'a, ()>;

impl Dispatcher {
    /// Creates a dispatcher with its own lock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until the current thread holds a turn.
    pub fn enter(&self) -> Turn<'_> {
        self.lock.lock()
    }

    /// `true` if both values share the same underlying lock.
    pub fn same_as(&self, other: &Dispatcher) -> bool {
        Arc::ptr_eq(&self.lock, &other.lock)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
