//! # panda-core
//!
//! Shared library for the Panda Game real-time client.  It holds the pure
//! types that the connection layer and the surrounding application agree on:
//!
//! - **`domain::config`** – Where the backend lives.  [`LinkConfig`] turns a
//!   base hostname into the fixed WebSocket endpoint (`<backend>/ws`).
//! - **`domain::event`** – What arrives over the wire.  A [`MessageEvent`] is
//!   an opaque text or binary payload tagged with the connection it came from.
//! - **`domain::session`** – Who the user is.  [`SessionState`] holds the
//!   identity record (name, session id, player id) returned by the backend
//!   after login.
//!
//! This crate has no dependencies on sockets, async runtimes, or UI code.

pub mod domain;

pub use domain::config::{ConfigError, LinkConfig};
pub use domain::event::{HandleId, MessageEvent, Payload};
pub use domain::session::{SessionState, UserInfo};
