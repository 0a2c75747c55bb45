//! Session cookie attached to WebSocket handshakes.
//!
//! The backend authenticates the `/ws` upgrade with the session cookie set by
//! its `/login` or `/guest` routes.  Browsers attach it automatically; a
//! native client has to do it itself.  [`SessionCookie`] is read every time a
//! handshake starts, which is why the login flow is "store the new cookie,
//! then `reset()` the connection".

use std::sync::Arc;

use parking_lot::RwLock;
use tokio_tungstenite::tungstenite::http::HeaderValue;

use crate::infrastructure::transport::TransportError;

/// Shared, replaceable `Cookie` header value.
///
/// Cloning yields a handle to the same value.
#[derive(Debug, Clone, Default)]
pub struct SessionCookie {
    value: Arc<RwLock<Option<HeaderValue>>>,
}

impl SessionCookie {
    /// Creates an empty cookie store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `cookie` (e.g. `"session=abc123"`), replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidHeader`] if the value contains bytes
    /// that are not allowed in an HTTP header.  The stored value is left
    /// unchanged in that case.
    pub fn set(&self, cookie: &str) -> Result<(), TransportError> {
        let header = HeaderValue::from_str(cookie)
            .map_err(|_| TransportError::InvalidHeader(cookie.escape_debug().to_string()))?;
        *self.value.write() = Some(header);
        Ok(())
    }

    /// Removes the stored cookie; later handshakes go out unauthenticated.
    pub fn clear(&self) {
        *self.value.write() = None;
    }

    /// The header value the next handshake will carry.
    pub fn header(&self) -> Option<HeaderValue> {
        self.value.read().clone()
    }

    pub fn is_set(&self) -> bool {
        self.value.read().is_some()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_cookie_is_empty() {
        let cookie = SessionCookie::new();
        assert!(!cookie.is_set());
        assert!(cookie.header().is_none());
    }

    #[test]
    fn test_set_then_header_roundtrips_value() {
        let cookie = SessionCookie::new();
        cookie.set("session=abc123").unwrap();
        assert_eq!(cookie.header().unwrap(), "session=abc123");
    }

    #[test]
    fn test_clones_share_value() {
        // Arrange
        let cookie = SessionCookie::new();
        let shared = cookie.clone();

        // Act
        cookie.set("session=xyz").unwrap();

        // Assert: the clone observes the update
        assert!(shared.is_set());
    }

    #[test]
    fn test_invalid_header_is_rejected_and_previous_kept() {
        let cookie = SessionCookie::new();
        cookie.set("session=ok").unwrap();

        let result = cookie.set("bad\nvalue");

        assert!(matches!(result, Err(TransportError::InvalidHeader(_))));
        assert_eq!(cookie.header().unwrap(), "session=ok");
    }

    #[test]
    fn test_clear_removes_value() {
        let cookie = SessionCookie::new();
        cookie.set("session=abc").unwrap();
        cookie.clear();
        assert!(!cookie.is_set());
    }
}
