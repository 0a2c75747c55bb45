//! Line-oriented console driving a [`ConnectionManager`].
//!
//! The `panda-client` binary reads stdin one line at a time.  Plain lines are
//! sent to the backend verbatim; lines starting with `/` are commands:
//!
//! | Line              | Effect                                                  |
//! |-------------------|---------------------------------------------------------|
//! | `/close`          | Close the connection (no reconnect)                     |
//! | `/reset`          | Reconnect, re-subscribing if messages were being shown  |
//! | `/subscribe`      | Start printing inbound messages                         |
//! | `/unsubscribe`    | Stop printing inbound messages                          |
//! | `/cookie <value>` | Store the session cookie for the next handshake         |
//! | `/cookie`         | Forget the session cookie                               |
//! | `/identity <json>`| Replace the session identity record                     |
//! | `/whoami`         | Show name and player id                                 |
//! | `/state`          | Show the current handle and its state                   |
//! | `/quit`           | Close and exit                                          |
//! | `//text`          | Send `/text` literally                                  |
//!
//! The console is the "surrounding application" for the connection manager:
//! it is the one that knows a handler must be attached again after a reset.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use panda_core::{SessionState, UserInfo};
use thiserror::Error;

use crate::application::connection_manager::ConnectionManager;
use crate::infrastructure::cookie::SessionCookie;
use crate::infrastructure::transport::{MessageHandler, TransportError};

/// One parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Send(String),
    Close,
    Reset,
    Subscribe,
    Unsubscribe,
    Cookie(Option<String>),
    Identity(UserInfo),
    WhoAmI,
    State,
    Quit,
}

/// Errors produced while parsing a console line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command '/{0}'")]
    Unknown(String),

    #[error("/{0} takes no arguments")]
    UnexpectedArgument(&'static str),

    #[error("/{0} needs an argument")]
    MissingArgument(&'static str),

    #[error("invalid identity record: {0}")]
    InvalidIdentity(String),
}

/// What the caller should do after a command ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Nothing to show.
    Quiet,
    /// Show this line to the user.
    Line(String),
    /// Stop reading input.
    Quit,
}

/// Parses one input line.  Returns `Ok(None)` for a blank line.
///
/// # Errors
///
/// Returns a [`CommandError`] for unknown commands, missing or unexpected
/// arguments, and malformed `/identity` JSON.
pub fn parse(line: &str) -> Result<Option<ConsoleCommand>, CommandError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Ok(None);
    }

    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Some(ConsoleCommand::Send(line.to_string())));
    };
    if rest.starts_with('/') {
        return Ok(Some(ConsoleCommand::Send(rest.to_string())));
    }

    let (name, argument) = match rest.split_once(char::is_whitespace) {
        Some((name, argument)) => (name, Some(argument.trim()).filter(|a| !a.is_empty())),
        None => (rest, None),
    };

    let bare = |command: ConsoleCommand, label: &'static str| match argument {
        Some(_) => Err(CommandError::UnexpectedArgument(label)),
        None => Ok(Some(command)),
    };

    match name {
        "close" => bare(ConsoleCommand::Close, "close"),
        "reset" => bare(ConsoleCommand::Reset, "reset"),
        "subscribe" => bare(ConsoleCommand::Subscribe, "subscribe"),
        "unsubscribe" => bare(ConsoleCommand::Unsubscribe, "unsubscribe"),
        "whoami" => bare(ConsoleCommand::WhoAmI, "whoami"),
        "state" => bare(ConsoleCommand::State, "state"),
        "quit" | "exit" => bare(ConsoleCommand::Quit, "quit"),
        "cookie" => Ok(Some(ConsoleCommand::Cookie(argument.map(str::to_string)))),
        "identity" => {
            let json = argument.ok_or(CommandError::MissingArgument("identity"))?;
            let record = UserInfo::from_json(json)
                .map_err(|e| CommandError::InvalidIdentity(e.to_string()))?;
            Ok(Some(ConsoleCommand::Identity(record)))
        }
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

/// Executes console commands against the shared application objects.
pub struct Console {
    manager: Arc<ConnectionManager>,
    session: Arc<SessionState>,
    cookie: SessionCookie,
    printer: MessageHandler,
    showing_messages: AtomicBool,
}

impl Console {
    /// `printer` is what gets subscribed when messages should be shown.
    pub fn new(
        manager: Arc<ConnectionManager>,
        session: Arc<SessionState>,
        cookie: SessionCookie,
        printer: MessageHandler,
    ) -> Self {
        Self {
            manager,
            session,
            cookie,
            printer,
            showing_messages: AtomicBool::new(false),
        }
    }

    /// Runs one command.
    ///
    /// # Errors
    ///
    /// Returns the [`TransportError`] from a failed send or an invalid cookie
    /// value.  The console stays usable afterwards.
    pub fn execute(&self, command: ConsoleCommand) -> Result<Reply, TransportError> {
        match command {
            ConsoleCommand::Send(text) => {
                self.manager.send(text)?;
                Ok(Reply::Quiet)
            }
            ConsoleCommand::Close => {
                self.manager.close();
                Ok(Reply::Line("connection closing; /reset to reconnect".to_string()))
            }
            ConsoleCommand::Reset => {
                self.manager.reset();
                // The manager leaves the old handler on the old handle.
                if self.showing_messages.load(Ordering::Relaxed) {
                    self.attach_printer();
                }
                Ok(Reply::Line(format!(
                    "reconnecting to {} as {}",
                    self.manager.endpoint(),
                    self.manager.handle_id()
                )))
            }
            ConsoleCommand::Subscribe => {
                self.attach_printer();
                self.showing_messages.store(true, Ordering::Relaxed);
                Ok(Reply::Quiet)
            }
            ConsoleCommand::Unsubscribe => {
                self.manager.unsubscribe();
                self.showing_messages.store(false, Ordering::Relaxed);
                Ok(Reply::Quiet)
            }
            ConsoleCommand::Cookie(Some(value)) => {
                self.cookie.set(&value)?;
                Ok(Reply::Line(
                    "cookie stored; /reset to reconnect with it".to_string(),
                ))
            }
            ConsoleCommand::Cookie(None) => {
                self.cookie.clear();
                Ok(Reply::Line("cookie cleared".to_string()))
            }
            ConsoleCommand::Identity(record) => {
                self.session.update(record);
                Ok(Reply::Line(self.whoami()))
            }
            ConsoleCommand::WhoAmI => Ok(Reply::Line(self.whoami())),
            ConsoleCommand::State => Ok(Reply::Line(format!(
                "{} {}",
                self.manager.handle_id(),
                self.manager.ready_state()
            ))),
            ConsoleCommand::Quit => {
                self.manager.close();
                Ok(Reply::Quit)
            }
        }
    }

    fn attach_printer(&self) {
        let printer = MessageHandler::clone(&self.printer);
        self.manager.subscribe(move |event| printer(event));
    }

    fn whoami(&self) -> String {
        format!(
            "name={} id={}",
            self.session.name().as_deref().unwrap_or("<unset>"),
            self.session.id().as_deref().unwrap_or("<unset>")
        )
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
