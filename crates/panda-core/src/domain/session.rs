//! Session identity record and its holder.
//!
//! After login the backend hands the client a small identity record.  The
//! application keeps it in a [`SessionState`] so that views and the
//! connection layer's callers can ask "who am I?" without threading the
//! record through every call.  The holder does no I/O and no validation.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// The identity fields returned by the backend.
///
/// Field names on the wire follow the backend's JSON (`Name`, `SessionID`,
/// `PlayerID`).  Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "SessionID", default)]
    pub session_id: Option<String>,
    #[serde(rename = "PlayerID", default)]
    pub player_id: Option<String>,
}

impl UserInfo {
    /// Parses the backend's JSON identity record.
    ///
    /// `null` and missing fields both become `None`.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`serde_json::Error`] if `json` is not an object
    /// of the expected shape.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Holder for the current [`UserInfo`].
///
/// Starts with every field unset.  [`SessionState::update`] replaces the
/// whole record; there is no per-field setter.
#[derive(Debug, Default)]
pub struct SessionState {
    record: RwLock<UserInfo>,
}

impl SessionState {
    /// Creates a holder with an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the stored record wholesale.
    pub fn update(&self, record: UserInfo) {
        tracing::debug!(
            name = record.name.as_deref().unwrap_or("<unset>"),
            "session identity updated"
        );
        *self.record.write() = record;
    }

    /// The current display name.
    pub fn name(&self) -> Option<String> {
        self.record.read().name.clone()
    }

    /// The current player id.
    ///
    /// This is the id other players and the game engine know this user by,
    /// not the session id.
    pub fn id(&self) -> Option<String> {
        self.record.read().player_id.clone()
    }

    /// The current session id.
    pub fn session_id(&self) -> Option<String> {
        self.record.read().session_id.clone()
    }

    /// A copy of the whole record.
    pub fn snapshot(&self) -> UserInfo {
        self.record.read().clone()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, session: &str, player: &str) -> UserInfo {
        UserInfo {
            name: Some(name.to_string()),
            session_id: Some(session.to_string()),
            player_id: Some(player.to_string()),
        }
    }

    #[test]
    fn test_new_state_has_no_identity() {
        let state = SessionState::new();
        assert_eq!(state.name(), None);
        assert_eq!(state.id(), None);
        assert_eq!(state.session_id(), None);
    }

    #[test]
    fn test_update_sets_name_and_id() {
        // Arrange
        let state = SessionState::new();

        // Act
        state.update(record("panda", "s-1", "p-42"));

        // Assert
        assert_eq!(state.name().as_deref(), Some("panda"));
        assert_eq!(state.id().as_deref(), Some("p-42"));
    }

    #[test]
    fn test_id_returns_player_id_not_session_id() {
        let state = SessionState::new();
        state.update(record("panda", "session-value", "player-value"));
        assert_eq!(state.id().as_deref(), Some("player-value"));
        assert_eq!(state.session_id().as_deref(), Some("session-value"));
    }

    #[test]
    fn test_update_replaces_whole_record() {
        // Arrange: a fully populated record
        let state = SessionState::new();
        state.update(record("panda", "s-1", "p-1"));

        // Act: replace with a record that only carries a name
        state.update(UserInfo {
            name: Some("guest".to_string()),
            ..UserInfo::default()
        });

        // Assert: fields missing from the new record are cleared, not kept
        assert_eq!(state.name().as_deref(), Some("guest"));
        assert_eq!(state.id(), None);
        assert_eq!(state.session_id(), None);
    }

    #[test]
    fn test_from_json_reads_backend_field_names() {
        let info =
            UserInfo::from_json(r#"{"Name":"panda","SessionID":"s-9","PlayerID":"p-9"}"#).unwrap();
        assert_eq!(info, record("panda", "s-9", "p-9"));
    }

    #[test]
    fn test_from_json_null_and_missing_fields_are_none() {
        let info = UserInfo::from_json(r#"{"Name":null,"PlayerID":"p-1"}"#).unwrap();
        assert_eq!(info.name, None);
        assert_eq!(info.session_id, None);
        assert_eq!(info.player_id.as_deref(), Some("p-1"));
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        assert!(UserInfo::from_json("[1, 2]").is_err());
    }

    #[test]
    fn test_snapshot_is_independent_copy() {
        let state = SessionState::new();
        state.update(record("panda", "s-1", "p-1"));
        let snapshot = state.snapshot();
        state.update(UserInfo::default());
        assert_eq!(snapshot.name.as_deref(), Some("panda"));
    }
}
