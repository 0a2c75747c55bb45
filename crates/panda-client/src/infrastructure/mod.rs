//! Infrastructure layer for the real-time client.
//!
//! Contains the I/O-facing adapters the application layer is wired to.
//!
//! # Sub-modules
//!
//! - **`dispatch`** – The reentrant "turn" lock that makes manager operations
//!   and message delivery behave as if they ran on one logical thread.
//!
//! - **`transport`** – The `TransportHandle` / `Connector` seam, the
//!   tokio-tungstenite implementation behind it, and an in-memory mock for
//!   tests.
//!
//! - **`cookie`** – The session cookie sent with every WebSocket handshake.

pub mod cookie;
pub mod dispatch;
pub mod transport;
