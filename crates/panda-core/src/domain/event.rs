//! Inbound message events.
//!
//! The connection layer does not parse payloads.  Whatever the backend sends
//! is wrapped in a [`MessageEvent`] and handed to the subscribed handler
//! as-is; interpreting the JSON envelope (`messageType`, `message`) is the
//! surrounding application's job.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-unique identifier of one transport handle.
///
/// Every call to open a connection allocates a fresh id, so two handles
/// never compare equal even when they target the same endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u64);

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

impl HandleId {
    /// Allocates the next unused id.
    pub fn next() -> Self {
        Self(NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw numeric value, for logging.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// Body of an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// A UTF-8 text frame.
    Text(String),
    /// A binary frame.
    Binary(Vec<u8>),
}

/// One inbound message delivered on a specific connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEvent {
    /// The handle the message arrived on.
    pub handle: HandleId,
    /// The opaque payload.
    pub data: Payload,
}

impl MessageEvent {
    /// Creates a text event.
    pub fn text(handle: HandleId, text: impl Into<String>) -> Self {
        Self {
            handle,
            data: Payload::Text(text.into()),
        }
    }

    /// Creates a binary event.
    pub fn binary(handle: HandleId, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            handle,
            data: Payload::Binary(bytes.into()),
        }
    }

    /// The payload as text, or `None` for binary frames.
    pub fn as_text(&self) -> Option<&str> {
        match &self.data {
            Payload::Text(text) => Some(text),
            Payload::Binary(_) => None,
        }
    }
}

impl fmt::Display for MessageEvent {
    /// Text payloads print verbatim; binary payloads print their length only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.data {
            Payload::Text(text) => f.write_str(text),
            Payload::Binary(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
