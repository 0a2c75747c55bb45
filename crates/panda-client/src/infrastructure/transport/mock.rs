//! In-memory transport for unit and integration tests.
//!
//! # Why a mock transport?
//!
//! The WebSocket handle needs a live server and a tokio runtime, and its
//! state transitions happen on a background task at unpredictable times.
//! [`MockSocket`] replaces all of that with plain in-memory bookkeeping:
//!
//! - Outbound payloads are pushed into `sent` (or `dropped` once closing).
//! - `close()` calls are counted.
//! - [`MockSocket::deliver`] plays the role of the backend and dispatches an
//!   inbound message to whatever listeners are attached right now.
//! - State transitions the real transport would perform on its own are
//!   driven explicitly with [`MockSocket::set_state`].
//!
//! [`MockConnector`] hands out a new `MockSocket` per `open` call and keeps
//! every one of them, so tests can inspect handles that have already been
//! replaced by a reset.
//!
//! # Usage in tests
//!
//! ```
//! use std::sync::Arc;
//! use panda_client::application::ConnectionManager;
//! use panda_client::infrastructure::transport::mock::MockConnector;
//!
//! let connector = Arc::new(MockConnector::new());
//! let manager = ConnectionManager::with_endpoint(
//!     "ws://localhost:3000/ws".parse().unwrap(),
//!     connector.clone(),
//! );
//!
//! manager.send("hello").unwrap();
//! assert_eq!(connector.latest().unwrap().sent(), vec!["hello"]);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use panda_core::{HandleId, MessageEvent};
use url::Url;

use super::{
    Connector, ListenerId, ListenerSet, MessageHandler, ReadyState, StateCell, TransportError,
    TransportHandle,
};
use crate::infrastructure::dispatch::Dispatcher;

/// A transport handle that records every call instead of doing I/O.
pub struct MockSocket {
    id: HandleId,
    endpoint: Url,
    state: StateCell,
    listeners: ListenerSet,
    sent: Mutex<Vec<String>>,
    dropped: Mutex<Vec<String>>,
    close_calls: AtomicUsize,
}

impl MockSocket {
    /// Creates a handle in `initial` state.
    pub fn new(endpoint: Url, dispatcher: Dispatcher, initial: ReadyState) -> Self {
        Self {
            id: HandleId::next(),
            endpoint,
            state: StateCell::new(initial),
            listeners: ListenerSet::new(dispatcher),
            sent: Mutex::new(Vec::new()),
            dropped: Mutex::new(Vec::new()),
            close_calls: AtomicUsize::new(0),
        }
    }

    /// Simulates the backend sending a text message.
    ///
    /// Returns how many listeners were invoked.
    pub fn deliver(&self, text: &str) -> usize {
        self.listeners.dispatch(&MessageEvent::text(self.id, text))
    }

    /// Simulates the backend sending a binary message.
    pub fn deliver_binary(&self, bytes: &[u8]) -> usize {
        self.listeners.dispatch(&MessageEvent::binary(self.id, bytes))
    }

    /// Forces a state transition the real transport would make on its own
    /// (handshake completing, close handshake finishing, network drop).
    pub fn set_state(&self, state: ReadyState) {
        self.state.store(state);
    }

    /// The endpoint this handle was opened for.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Payloads accepted while open, in order.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    /// Payloads silently discarded because the handle was closing or closed.
    pub fn dropped(&self) -> Vec<String> {
        self.dropped.lock().clone()
    }

    /// How many times `close()` was called, including redundant calls.
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    /// Number of listeners currently attached.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl TransportHandle for MockSocket {
    fn id(&self) -> HandleId {
        self.id
    }

    fn ready_state(&self) -> ReadyState {
        self.state.load()
    }

    fn send(&self, text: &str) -> Result<(), TransportError> {
        match self.state.load() {
            ReadyState::Connecting => Err(TransportError::NotOpen {
                state: ReadyState::Connecting,
            }),
            ReadyState::Open => {
                self.sent.lock().push(text.to_string());
                Ok(())
            }
            ReadyState::Closing | ReadyState::Closed => {
                self.dropped.lock().push(text.to_string());
                Ok(())
            }
        }
    }

    fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.state.begin_close();
    }

    fn add_listener(&self, handler: MessageHandler) -> ListenerId {
        self.listeners.add(handler)
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }
}

/// Connector that creates [`MockSocket`]s and remembers all of them.
pub struct MockConnector {
    initial_state: ReadyState,
    opened: Mutex<Vec<Arc<MockSocket>>>,
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConnector {
    /// Handles start out already open.
    pub fn new() -> Self {
        Self::with_initial_state(ReadyState::Open)
    }

    /// Handles start out in `state`, e.g. [`ReadyState::Connecting`] to test
    /// sends racing the handshake.
    pub fn with_initial_state(state: ReadyState) -> Self {
        Self {
            initial_state: state,
            opened: Mutex::new(Vec::new()),
        }
    }

    /// Every handle opened so far, oldest first.
    pub fn opened(&self) -> Vec<Arc<MockSocket>> {
        self.opened.lock().clone()
    }

    /// The most recently opened handle.
    pub fn latest(&self) -> Option<Arc<MockSocket>> {
        self.opened.lock().last().cloned()
    }

    /// How many handles have been opened.
    pub fn open_count(&self) -> usize {
        self.opened.lock().len()
    }
}

impl Connector for MockConnector {
    fn open(&self, endpoint: &Url, dispatcher: &Dispatcher) -> Arc<dyn TransportHandle> {
        let socket = Arc::new(MockSocket::new(
            endpoint.clone(),
            dispatcher.clone(),
            self.initial_state,
        ));
        self.opened.lock().push(Arc::clone(&socket));
        socket
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
