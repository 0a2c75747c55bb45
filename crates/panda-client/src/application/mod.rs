//! Application layer for the real-time client.
//!
//! # What use cases does the client have?
//!
//! - **`connection_manager`** – Owns the one live connection to the backend's
//!   `/ws` endpoint and the one subscribed message handler.  Everything else
//!   in the client talks to the backend through it.
//!
//! - **`console`** – Parses stdin lines into commands and runs them against
//!   the connection manager, the session identity, and the session cookie.
//!   This is what the `panda-client` binary loops over.
//!
//! **Dependency rule**: this layer talks to transports only through the
//! `TransportHandle` and `Connector` traits, never to tokio-tungstenite
//! directly.

pub mod connection_manager;
pub mod console;

pub use connection_manager::ConnectionManager;
pub use console::{CommandError, Console, ConsoleCommand, Reply};
