//! Transport abstraction: one live connection to the backend.
//!
//! A [`TransportHandle`] is one instance of the underlying real-time
//! connection.  It owns its listener list, follows the
//! `CONNECTING → OPEN → CLOSING → CLOSED` state machine, and is never reused
//! once closed: reconnecting means asking a [`Connector`] for a brand new
//! handle.
//!
//! Two implementations live below this module:
//!
//! - [`websocket`] – the real thing, built on `tokio-tungstenite`.
//! - [`mock`] – an in-memory handle that records every call, for tests.

pub mod listeners;
pub mod mock;
pub mod websocket;

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use panda_core::{HandleId, MessageEvent};
use thiserror::Error;
use url::Url;

use crate::infrastructure::dispatch::Dispatcher;

pub use listeners::ListenerSet;

/// Callback invoked once per inbound message.
pub type MessageHandler = Arc<dyn Fn(&MessageEvent) + Send + Sync>;

/// Errors surfaced by transport operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    /// `send` was called before the handshake completed.
    #[error("connection is not open yet (state: {state})")]
    NotOpen { state: ReadyState },

    /// The WebSocket connector was created outside a tokio runtime.
    #[error("no tokio runtime available to drive the connection")]
    NoRuntime,

    /// A handshake header value contains characters HTTP does not allow.
    #[error("invalid handshake header value: {0}")]
    InvalidHeader(String),
}

/// Lifecycle state of one transport handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ReadyState {
    /// The handshake is in progress.
    Connecting = 0,
    /// Messages can be sent and received.
    Open = 1,
    /// A close was requested; inbound messages may still arrive.
    Closing = 2,
    /// The connection is gone.  Terminal.
    Closed = 3,
}

impl ReadyState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Connecting,
            1 => Self::Open,
            2 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connecting => "CONNECTING",
            Self::Open => "OPEN",
            Self::Closing => "CLOSING",
            Self::Closed => "CLOSED",
        })
    }
}

/// Atomically updated [`ReadyState`] shared between a handle and its driver.
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    pub fn new(state: ReadyState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub fn load(&self) -> ReadyState {
        ReadyState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn store(&self, state: ReadyState) {
        self.0.store(state as u8, Ordering::Release);
    }

    /// Moves from `from` to `to` only if the current state is `from`.
    ///
    /// Returns `true` if the transition happened.
    pub fn transition(&self, from: ReadyState, to: ReadyState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Moves an open or connecting handle to `Closing`.
    ///
    /// Returns the state the handle was in if the transition happened, or
    /// `None` if it was already closing or closed.
    pub fn begin_close(&self) -> Option<ReadyState> {
        [ReadyState::Connecting, ReadyState::Open]
            .into_iter()
            .find(|&from| self.transition(from, ReadyState::Closing))
    }
}

/// Process-unique token identifying one attached listener.
///
/// Ids are never reused across handles, so removing an id from a handle it
/// was never attached to is always a harmless no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

impl ListenerId {
    /// Allocates the next unused id.
    pub fn next() -> Self {
        Self(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

/// One live connection to the backend.
///
/// Every method is synchronous and returns immediately; the outcome of
/// opening or closing is observed later through [`TransportHandle::ready_state`].
#[cfg_attr(test, mockall::automock)]
pub trait TransportHandle: Send + Sync {
    /// Identity of this handle.
    fn id(&self) -> HandleId;

    /// Current lifecycle state.
    fn ready_state(&self) -> ReadyState;

    /// Transmits a text payload.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::NotOpen`] while the handle is still
    /// connecting.  Once closing or closed the payload is silently dropped
    /// and `Ok(())` is returned.
    fn send(&self, text: &str) -> Result<(), TransportError>;

    /// Requests termination.  Idempotent; a no-op once closing or closed.
    fn close(&self);

    /// Attaches a listener for inbound messages.
    fn add_listener(&self, handler: MessageHandler) -> ListenerId;

    /// Detaches a listener.  Returns `false` if `id` was not attached here.
    fn remove_listener(&self, id: ListenerId) -> bool;
}

/// Factory for transport handles directed at an endpoint.
pub trait Connector: Send + Sync {
    /// Starts opening a new connection and returns its handle immediately.
    ///
    /// The handle begins in [`ReadyState::Connecting`] (or whatever state the
    /// implementation can determine synchronously).  Its listeners are
    /// dispatched inside turns of `dispatcher`.
    fn open(&self, endpoint: &Url, dispatcher: &Dispatcher) -> Arc<dyn TransportHandle>;
}

impl<F> Connector for F
where
    F: Fn(&Url, &Dispatcher) -> Arc<dyn TransportHandle> + Send + Sync,
{
    fn open(&self, endpoint: &Url, dispatcher: &Dispatcher) -> Arc<dyn TransportHandle> {
        self(endpoint, dispatcher)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_state_display_matches_websocket_names() {
        assert_eq!(ReadyState::Connecting.to_string(), "CONNECTING");
        assert_eq!(ReadyState::Open.to_string(), "OPEN");
        assert_eq!(ReadyState::Closing.to_string(), "CLOSING");
        assert_eq!(ReadyState::Closed.to_string(), "CLOSED");
    }

    #[test]
    fn test_state_cell_transition_requires_expected_state() {
        // Arrange
        let cell = StateCell::new(ReadyState::Connecting);

        // Act / Assert: wrong `from` is rejected, right `from` succeeds
        assert!(!cell.transition(ReadyState::Open, ReadyState::Closing));
        assert!(cell.transition(ReadyState::Connecting, ReadyState::Open));
        assert_eq!(cell.load(), ReadyState::Open);
    }

    #[test]
    fn test_begin_close_from_open() {
        let cell = StateCell::new(ReadyState::Open);
        assert_eq!(cell.begin_close(), Some(ReadyState::Open));
        assert_eq!(cell.load(), ReadyState::Closing);
    }

    #[test]
    fn test_begin_close_from_connecting() {
        let cell = StateCell::new(ReadyState::Connecting);
        assert_eq!(cell.begin_close(), Some(ReadyState::Connecting));
        assert_eq!(cell.load(), ReadyState::Closing);
    }

    #[test]
    fn test_begin_close_is_noop_when_already_closing_or_closed() {
        let closing = StateCell::new(ReadyState::Closing);
        assert_eq!(closing.begin_close(), None);

        let closed = StateCell::new(ReadyState::Closed);
        assert_eq!(closed.begin_close(), None);
        assert_eq!(closed.load(), ReadyState::Closed);
    }

    #[test]
    fn test_listener_ids_are_unique() {
        assert_ne!(ListenerId::next(), ListenerId::next());
    }

    #[test]
    fn test_not_open_error_message_names_state() {
        let err = TransportError::NotOpen {
            state: ReadyState::Connecting,
        };
        assert_eq!(err.to_string(), "connection is not open yet (state: CONNECTING)");
    }
}
