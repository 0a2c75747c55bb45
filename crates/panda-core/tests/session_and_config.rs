//! Integration tests for the public panda-core API.
//!
//! Exercises the pieces an application wires together at startup: a
//! `LinkConfig` read from TOML, its derived endpoint, and a `SessionState`
//! shared between threads.

use std::sync::Arc;
use std::thread;

use panda_core::{LinkConfig, SessionState, UserInfo};

#[test]
fn test_toml_config_resolves_endpoint() {
    // Arrange: the shape of a deployed config file
    let toml = r#"
        backend = "https://panda.example.com/"
        path = "/ws"
        close_timeout_secs = 2
    "#;

    // Act
    let config = LinkConfig::from_toml_str(toml).unwrap();
    let endpoint = config.endpoint().unwrap();

    // Assert
    assert_eq!(endpoint.as_str(), "wss://panda.example.com/ws");
    assert_eq!(config.close_timeout().as_secs(), 2);
}

#[test]
fn test_empty_toml_matches_defaults() {
    let config = LinkConfig::from_toml_str("").unwrap();
    assert_eq!(config, LinkConfig::default());
    assert_eq!(
        config.endpoint().unwrap().as_str(),
        "ws://localhost:3000/ws"
    );
}

#[test]
fn test_login_record_flows_into_shared_session() {
    // Arrange: the JSON body the backend returns after /login
    let body = r#"{"Name":"red-panda","SessionID":"s-42","PlayerID":"p-7"}"#;
    let session = Arc::new(SessionState::new());

    // Act: update on one thread, read on another
    let writer = Arc::clone(&session);
    thread::spawn(move || writer.update(UserInfo::from_json(body).unwrap()))
        .join()
        .unwrap();

    // Assert
    let reader = Arc::clone(&session);
    let (name, id) = thread::spawn(move || (reader.name(), reader.id()))
        .join()
        .unwrap();
    assert_eq!(name.as_deref(), Some("red-panda"));
    assert_eq!(id.as_deref(), Some("p-7"));
    assert_eq!(session.session_id().as_deref(), Some("s-42"));
}

#[test]
fn test_second_update_replaces_every_field() {
    let session = SessionState::new();
    session.update(UserInfo::from_json(r#"{"Name":"a","SessionID":"s","PlayerID":"p"}"#).unwrap());

    session.update(UserInfo::from_json(r#"{"Name":"b"}"#).unwrap());

    assert_eq!(session.name().as_deref(), Some("b"));
    assert_eq!(session.id(), None);
    assert_eq!(session.session_id(), None);
}
