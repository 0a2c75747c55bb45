//! Domain entities for the Panda Game client.
//!
//! Nothing in here performs I/O.  Configuration is parsed from strings the
//! caller has already read, events are plain values, and the session holder
//! only stores what it is given.

/// Backend endpoint configuration.
pub mod config;

/// Inbound message events.
pub mod event;

/// Session identity record and its holder.
pub mod session;
