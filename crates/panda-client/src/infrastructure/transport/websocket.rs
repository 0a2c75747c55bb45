//! WebSocket transport built on `tokio-tungstenite`.
//!
//! Each [`WsSocket`] is backed by one driver task spawned on the tokio
//! runtime captured by its [`WsConnector`]:
//!
//! ```text
//! WsSocket (sync API)                driver task (async)
//! ───────────────────                ───────────────────
//! send(text) ── Outbound::Text ──▶   sink.send(Message::Text)
//! close()    ── Outbound::Close ─▶   sink.send(Message::Close), drain
//!                                    inbound.next() ── dispatch ──▶ listeners
//! ready_state() ◀─── StateCell ───   Connecting → Open → Closing → Closed
//! ```
//!
//! The socket API never blocks or awaits: `send` and `close` only push a
//! command onto an unbounded channel.  That channel is the transport's own
//! write buffer (the equivalent of a browser socket's `bufferedAmount`); it
//! is not a retry queue, and nothing is buffered across handles.
//!
//! # Failure visibility
//!
//! Handshake failures, read errors and remote closes are logged here and end
//! in [`ReadyState::Closed`].  Nothing is reported back through the socket
//! API and nothing reconnects.
//!
//! # Dropping
//!
//! When the last `Arc<WsSocket>` is dropped the command channel closes and
//! the driver performs a normal close.  The driver task keeps the listener
//! list alive until then, so listeners still attached to a replaced handle
//! keep seeing whatever that handle receives while it is closing.

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::SplitStream;
use futures_util::{SinkExt, StreamExt};
use panda_core::{HandleId, MessageEvent};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::header::COOKIE;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

use super::{
    Connector, ListenerId, ListenerSet, MessageHandler, ReadyState, StateCell, TransportError,
    TransportHandle,
};
use crate::infrastructure::cookie::SessionCookie;
use crate::infrastructure::dispatch::Dispatcher;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Commands from the socket API to its driver task.
#[derive(Debug)]
enum Outbound {
    Text(String),
    Close,
}

/// State shared between a socket and its driver.
struct Shared {
    id: HandleId,
    state: StateCell,
    listeners: ListenerSet,
}

/// One WebSocket connection.
pub struct WsSocket {
    shared: Arc<Shared>,
    commands: UnboundedSender<Outbound>,
}

impl TransportHandle for WsSocket {
    fn id(&self) -> HandleId {
        self.shared.id
    }

    fn ready_state(&self) -> ReadyState {
        self.shared.state.load()
    }

    fn send(&self, text: &str) -> Result<(), TransportError> {
        let id = self.shared.id;
        match self.shared.state.load() {
            ReadyState::Connecting => Err(TransportError::NotOpen {
                state: ReadyState::Connecting,
            }),
            ReadyState::Open => {
                if self.commands.send(Outbound::Text(text.to_string())).is_err() {
                    // Driver already exited; the state update is about to land.
                    debug!("{id}: driver gone, dropping {} byte message", text.len());
                }
                Ok(())
            }
            state @ (ReadyState::Closing | ReadyState::Closed) => {
                debug!("{id}: socket is {state}, dropping {} byte message", text.len());
                Ok(())
            }
        }
    }

    fn close(&self) {
        if let Some(previous) = self.shared.state.begin_close() {
            debug!("{}: close requested (was {previous})", self.shared.id);
            let _ = self.commands.send(Outbound::Close);
        }
    }

    fn add_listener(&self, handler: MessageHandler) -> ListenerId {
        self.shared.listeners.add(handler)
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.shared.listeners.remove(id)
    }
}

/// Opens [`WsSocket`]s on the runtime that was current when it was built.
pub struct WsConnector {
    runtime: tokio::runtime::Handle,
    cookie: SessionCookie,
    close_timeout: Duration,
}

impl WsConnector {
    /// Creates a connector bound to the current tokio runtime.
    ///
    /// `close_timeout` bounds how long a locally initiated close waits for
    /// the server's Close frame.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::NoRuntime`] when called outside a tokio
    /// runtime context.
    pub fn new(close_timeout: Duration) -> Result<Self, TransportError> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| TransportError::NoRuntime)?;
        Ok(Self {
            runtime,
            cookie: SessionCookie::new(),
            close_timeout,
        })
    }

    /// Uses `cookie` for every handshake this connector performs.
    pub fn with_cookie(mut self, cookie: SessionCookie) -> Self {
        self.cookie = cookie;
        self
    }

    /// The cookie store consulted on each `open`.
    pub fn cookie(&self) -> &SessionCookie {
        &self.cookie
    }
}

impl Connector for WsConnector {
    fn open(&self, endpoint: &Url, dispatcher: &Dispatcher) -> Arc<dyn TransportHandle> {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            id: HandleId::next(),
            state: StateCell::new(ReadyState::Connecting),
            listeners: ListenerSet::new(dispatcher.clone()),
        });

        match handshake_request(endpoint, self.cookie.header()) {
            Ok(request) => {
                debug!("{}: connecting to {endpoint}", shared.id);
                self.runtime.spawn(drive(
                    request,
                    command_rx,
                    Arc::clone(&shared),
                    self.close_timeout,
                ));
            }
            Err(e) => {
                warn!("{}: cannot build handshake for {endpoint}: {e}", shared.id);
                shared.state.store(ReadyState::Closed);
            }
        }

        Arc::new(WsSocket { shared, commands })
    }
}

/// Builds the upgrade request, attaching the session cookie if one is set.
fn handshake_request(
    endpoint: &Url,
    cookie: Option<HeaderValue>,
) -> Result<Request, tokio_tungstenite::tungstenite::Error> {
    let mut request = endpoint.as_str().into_client_request()?;
    if let Some(cookie) = cookie {
        request.headers_mut().insert(COOKIE, cookie);
    }
    Ok(request)
}

// ── Driver task ───────────────────────────────────────────────────────────────

/// Runs one connection from handshake to close.
async fn drive(
    request: Request,
    mut commands: UnboundedReceiver<Outbound>,
    shared: Arc<Shared>,
    close_timeout: Duration,
) {
    let id = shared.id;

    // ── Handshake, abortable by close() ───────────────────────────────────────
    let connect = connect_async(request);
    tokio::pin!(connect);
    let stream = tokio::select! {
        result = &mut connect => match result {
            Ok((stream, _response)) => stream,
            Err(e) => {
                warn!("{id}: WebSocket handshake failed: {e}");
                shared.state.store(ReadyState::Closed);
                return;
            }
        },
        () = wait_for_close(&mut commands) => {
            debug!("{id}: closed before the handshake completed");
            shared.state.store(ReadyState::Closed);
            return;
        }
    };

    // A close() racing the handshake leaves the state at Closing and a Close
    // command queued; the loop below handles it.
    if shared.state.transition(ReadyState::Connecting, ReadyState::Open) {
        info!("{id}: connected");
    }

    let (mut sink, mut inbound) = stream.split();

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Outbound::Text(text)) => {
                    if let Err(e) = sink.send(WsMessage::Text(text)).await {
                        warn!("{id}: send failed: {e}");
                        break;
                    }
                }
                Some(Outbound::Close) | None => {
                    // `None` means every socket handle was dropped.
                    shared.state.begin_close();
                    match sink.send(WsMessage::Close(None)).await {
                        Ok(()) => {
                            if timeout(close_timeout, drain(&mut inbound, &shared)).await.is_err() {
                                debug!("{id}: no Close reply within {close_timeout:?}");
                            }
                        }
                        Err(e) => debug!("{id}: could not send Close frame: {e}"),
                    }
                    break;
                }
            },
            frame = inbound.next() => match frame {
                Some(Ok(message)) => {
                    if let WsMessage::Close(frame) = message {
                        debug!("{id}: server closed the connection: {frame:?}");
                        shared.state.begin_close();
                        // Flushes the Close reply tungstenite queued on read.
                        let _ = sink.close().await;
                        break;
                    }
                    deliver(&shared, message);
                }
                Some(Err(e)) => {
                    warn!("{id}: read failed: {e}");
                    break;
                }
                None => {
                    debug!("{id}: stream ended");
                    break;
                }
            }
        }
    }

    shared.state.store(ReadyState::Closed);
    info!("{id}: closed");
}

/// Resolves once a Close command arrives or every sender is gone.
async fn wait_for_close(commands: &mut UnboundedReceiver<Outbound>) {
    while let Some(command) = commands.recv().await {
        if matches!(command, Outbound::Close) {
            return;
        }
        // Text cannot be queued while connecting: send() rejects it.
    }
}

/// Keeps dispatching inbound frames until the server's Close arrives.
async fn drain(inbound: &mut SplitStream<WsStream>, shared: &Shared) {
    while let Some(Ok(message)) = inbound.next().await {
        if matches!(message, WsMessage::Close(_)) {
            return;
        }
        deliver(shared, message);
    }
}

/// Dispatches data frames to the listeners.  Control frames are handled by
/// tungstenite itself and ignored here.
fn deliver(shared: &Shared, message: WsMessage) {
    let event = match message {
        WsMessage::Text(text) => MessageEvent::text(shared.id, text),
        WsMessage::Binary(bytes) => MessageEvent::binary(shared.id, bytes),
        WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) | WsMessage::Close(_) => {
            return;
        }
    };
    let invoked = shared.listeners.dispatch(&event);
    if invoked == 0 {
        debug!("{}: message arrived with no listener attached", shared.id);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
