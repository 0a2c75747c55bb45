//! panda-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does panda-client do? (for beginners)
//!
//! The Panda Game backend pushes lobby and game updates to players over a
//! WebSocket at `/ws`.  This crate is the client side of that channel:
//!
//! 1. Resolves the WebSocket endpoint once from the configured backend
//!    address (`http://` becomes `ws://`, `https://` becomes `wss://`).
//! 2. Keeps exactly one live connection open, replacing it on `reset()`.
//! 3. Forwards text sent by the application and hands every inbound message
//!    to a single subscribed handler.
//! 4. Attaches the session cookie from the backend's login flow to each
//!    handshake.
//!
//! The message payloads themselves are opaque here; interpreting them is the
//! job of whoever subscribes.

/// Application layer: the connection manager and the console.
pub mod application;

/// Infrastructure layer: WebSocket transport, dispatch lock, session cookie.
pub mod infrastructure;
