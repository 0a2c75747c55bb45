//! ConnectionManager: the single live connection and its single subscriber.
//!
//! The manager owns exactly one *current* transport handle, directed at an
//! endpoint resolved once at construction, and at most one attached message
//! handler.  Callers never see the handle or the handler slot; they only call
//! the five operations below.
//!
//! | Operation       | Effect                                                        |
//! |-----------------|---------------------------------------------------------------|
//! | `send(text)`    | Transmit on the current handle                                |
//! | `close()`       | Ask the current handle to close; nothing else changes         |
//! | `reset()`       | Close the current handle and open a fresh one, same endpoint  |
//! | `subscribe(h)`  | Detach the previous handler (if any), attach `h`              |
//! | `unsubscribe()` | Detach the handler (if any)                                   |
//!
//! # Reset does not carry the subscription over
//!
//! The handler is attached to a *handle*, not to the manager.  After
//! `reset()` it stays attached to the old, closing handle and receives
//! nothing from the new one.  Call `subscribe` again after a reset.
//!
//! # Failure semantics
//!
//! The manager never retries, never reconnects on its own, and does not
//! inspect the handle's state before acting.  Transport failures are visible
//! only through [`ConnectionManager::ready_state`] and the transport's logs.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use panda_core::{ConfigError, HandleId, LinkConfig, MessageEvent};
use tracing::{debug, info};
use url::Url;

use crate::infrastructure::dispatch::Dispatcher;
use crate::infrastructure::transport::{
    Connector, ListenerId, ReadyState, TransportError, TransportHandle,
};

/// Mutable bookkeeping, guarded by one leaf mutex.
struct ManagerState {
    handle: Arc<dyn TransportHandle>,
    /// The handler slot.  Holds the listener token, not the closure.
    listener: Option<ListenerId>,
}

/// Owner of the live connection.
///
/// Construct one per application session and share it by reference (or
/// `Arc`).  All methods take `&self`, never block on I/O, and may be called
/// from inside a subscribed handler.
pub struct ConnectionManager {
    endpoint: Url,
    connector: Arc<dyn Connector>,
    dispatcher: Dispatcher,
    state: Mutex<ManagerState>,
}

impl ConnectionManager {
    /// Resolves the endpoint from `config` and starts the first connection.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the backend address does not yield a
    /// valid WebSocket URL.  Connection failures are not errors here; they
    /// happen later, asynchronously.
    pub fn new(config: &LinkConfig, connector: Arc<dyn Connector>) -> Result<Self, ConfigError> {
        Ok(Self::with_endpoint(config.endpoint()?, connector))
    }

    /// Starts the first connection to an already resolved endpoint.
    pub fn with_endpoint(endpoint: Url, connector: Arc<dyn Connector>) -> Self {
        let dispatcher = Dispatcher::new();
        let handle = connector.open(&endpoint, &dispatcher);
        info!("real-time connection {} → {endpoint}", handle.id());

        Self {
            endpoint,
            connector,
            dispatcher,
            state: Mutex::new(ManagerState {
                handle,
                listener: None,
            }),
        }
    }

    /// Transmits `message` over the current handle.
    ///
    /// # Errors
    ///
    /// Propagates whatever the transport does with a payload it cannot send:
    /// [`TransportError::NotOpen`] while the handshake is still running.
    /// Once the handle is closing or closed the payload is dropped silently
    /// and `Ok(())` is returned.  No new connection is ever created here.
    pub fn send(&self, message: impl AsRef<str>) -> Result<(), TransportError> {
        let _turn = self.dispatcher.enter();
        let state = self.state.lock();
        state.handle.send(message.as_ref())
    }

    /// Requests termination of the current handle.
    ///
    /// The handle is not replaced and the handler stays recorded.  Later
    /// `send` calls go to the closed handle until [`reset`](Self::reset).
    pub fn close(&self) {
        let _turn = self.dispatcher.enter();
        let state = self.state.lock();
        debug!("closing {}", state.handle.id());
        state.handle.close();
    }

    /// Closes the current handle and opens a new one on the same endpoint.
    ///
    /// Always succeeds; whether the new connection comes up is observable
    /// only through [`ready_state`](Self::ready_state).  The subscribed
    /// handler is **not** moved to the new handle.
    pub fn reset(&self) {
        let _turn = self.dispatcher.enter();
        let mut state = self.state.lock();

        let old = state.handle.id();
        state.handle.close();
        state.handle = self.connector.open(&self.endpoint, &self.dispatcher);
        let new = state.handle.id();

        info!("reset: {old} closed, {new} → {}", self.endpoint);
        if let Some(listener) = state.listener {
            debug!("{listener} remains on {old}; subscribe again to receive messages on {new}");
        }
    }

    /// Makes `handler` the one consumer of inbound messages.
    ///
    /// Any previously subscribed handler is detached from the current handle
    /// first, so it receives nothing once this call returns.
    pub fn subscribe<F>(&self, handler: F)
    where
        F: Fn(&MessageEvent) + Send + Sync + 'static,
    {
        let _turn = self.dispatcher.enter();
        let mut state = self.state.lock();

        if let Some(previous) = state.listener.take() {
            state.handle.remove_listener(previous);
        }
        let id = state.handle.add_listener(Arc::new(handler));
        state.listener = Some(id);
        debug!("{id} subscribed on {}", state.handle.id());
    }

    /// Detaches the subscribed handler.  A no-op when nothing is subscribed.
    pub fn unsubscribe(&self) {
        let _turn = self.dispatcher.enter();
        let mut state = self.state.lock();

        let Some(id) = state.listener.take() else {
            return;
        };
        state.handle.remove_listener(id);
        debug!("{id} unsubscribed from {}", state.handle.id());
    }

    /// The endpoint every handle is opened for.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// State of the current handle.
    pub fn ready_state(&self) -> ReadyState {
        self.state.lock().handle.ready_state()
    }

    /// Identity of the current handle.
    pub fn handle_id(&self) -> HandleId {
        self.state.lock().handle.id()
    }

    /// `true` while a handler is recorded in the slot.
    pub fn is_subscribed(&self) -> bool {
        self.state.lock().listener.is_some()
    }
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ConnectionManager")
            .field("endpoint", &self.endpoint.as_str())
            .field("handle", &state.handle.id())
            .field("listener", &state.listener)
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::transport::MockTransportHandle;
    use mockall::predicate::eq;
    use std::collections::VecDeque;

    fn endpoint() -> Url {
        "ws://localhost:3000/ws".parse().unwrap()
    }

    /// A connector that hands out the given mocks in order.
    fn connector_of(handles: Vec<MockTransportHandle>) -> Arc<dyn Connector> {
        let queue: Mutex<VecDeque<Arc<dyn TransportHandle>>> = Mutex::new(
            handles
                .into_iter()
                .map(|h| Arc::new(h) as Arc<dyn TransportHandle>)
                .collect(),
        );
        Arc::new(move |_: &Url, _: &Dispatcher| {
            queue
                .lock()
                .pop_front()
                .expect("connector asked for more handles than the test provided")
        })
    }

    fn mock_handle() -> MockTransportHandle {
        let mut handle = MockTransportHandle::new();
        handle.expect_id().return_const(HandleId::next());
        handle
    }

    #[test]
    fn test_new_rejects_invalid_backend() {
        let config = LinkConfig::with_backend("ftp://example.com");
        let result = ConnectionManager::new(&config, connector_of(vec![]));
        assert!(matches!(result, Err(ConfigError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_unsubscribe_without_subscription_never_touches_handle() {
        // Arrange
        let mut handle = mock_handle();
        handle.expect_remove_listener().times(0);
        let manager = ConnectionManager::with_endpoint(endpoint(), connector_of(vec![handle]));

        // Act
        manager.unsubscribe();
        manager.unsubscribe();

        // Assert: expectations are verified when the mock drops
        assert!(!manager.is_subscribed());
    }

    #[test]
    fn test_second_subscribe_detaches_first_listener() {
        // Arrange
        let first = ListenerId::next();
        let second = ListenerId::next();
        let mut ids = VecDeque::from([first, second]);

        let mut handle = mock_handle();
        handle
            .expect_add_listener()
            .times(2)
            .returning(move |_| ids.pop_front().unwrap());
        handle
            .expect_remove_listener()
            .with(eq(first))
            .times(1)
            .return_const(true);
        let manager = ConnectionManager::with_endpoint(endpoint(), connector_of(vec![handle]));

        // Act
        manager.subscribe(|_| {});
        manager.subscribe(|_| {});

        // Assert
        assert!(manager.is_subscribed());
    }

    #[test]
    fn test_send_forwards_payload_to_current_handle() {
        let mut handle = mock_handle();
        handle
            .expect_send()
            .withf(|text| text == "hello")
            .times(1)
            .returning(|_| Ok(()));
        let manager = ConnectionManager::with_endpoint(endpoint(), connector_of(vec![handle]));

        assert_eq!(manager.send("hello"), Ok(()));
    }

    #[test]
    fn test_send_propagates_transport_error() {
        let mut handle = mock_handle();
        handle.expect_send().returning(|_| {
            Err(TransportError::NotOpen {
                state: ReadyState::Connecting,
            })
        });
        let manager = ConnectionManager::with_endpoint(endpoint(), connector_of(vec![handle]));

        assert!(matches!(
            manager.send("early"),
            Err(TransportError::NotOpen { .. })
        ));
    }

    #[test]
    fn test_close_does_not_open_a_new_handle() {
        // Arrange: the connector only has one handle; a second open would panic
        let mut handle = mock_handle();
        handle.expect_close().times(1).return_const(());
        handle.expect_send().times(1).returning(|_| Ok(()));
        let manager = ConnectionManager::with_endpoint(endpoint(), connector_of(vec![handle]));

        // Act
        manager.close();
        let result = manager.send("after close");

        // Assert
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn test_reset_closes_old_and_sends_on_new() {
        // Arrange
        let mut old = mock_handle();
        old.expect_close().times(1).return_const(());
        old.expect_send().times(0);

        let mut new = mock_handle();
        new.expect_close().times(0);
        new.expect_send()
            .withf(|text| text == "after reset")
            .times(1)
            .returning(|_| Ok(()));

        let manager = ConnectionManager::with_endpoint(endpoint(), connector_of(vec![old, new]));
        let before = manager.handle_id();

        // Act
        manager.reset();
        manager.send("after reset").unwrap();

        // Assert
        assert_ne!(manager.handle_id(), before);
    }

    #[test]
    fn test_unsubscribe_after_reset_targets_new_handle() {
        // Arrange: the listener lives on the old handle
        let listener = ListenerId::next();
        let mut old = mock_handle();
        old.expect_add_listener().times(1).return_const(listener);
        old.expect_close().times(1).return_const(());
        old.expect_remove_listener().times(0);

        let mut new = mock_handle();
        new.expect_remove_listener()
            .with(eq(listener))
            .times(1)
            .return_const(false);

        let manager = ConnectionManager::with_endpoint(endpoint(), connector_of(vec![old, new]));
        manager.subscribe(|_| {});

        // Act
        manager.reset();
        manager.unsubscribe();

        // Assert: the slot is cleared even though the new handle had nothing
        assert!(!manager.is_subscribed());
    }

    #[test]
    fn test_ready_state_reports_current_handle() {
        let mut handle = mock_handle();
        handle.expect_ready_state().return_const(ReadyState::Connecting);
        let manager = ConnectionManager::with_endpoint(endpoint(), connector_of(vec![handle]));

        assert_eq!(manager.ready_state(), ReadyState::Connecting);
    }
}
