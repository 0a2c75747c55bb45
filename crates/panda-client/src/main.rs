//! Panda Game real-time client: entry point.
//!
//! Opens the backend's `/ws` channel through a [`ConnectionManager`], prints
//! every inbound message to stdout, and turns stdin lines into sends and
//! console commands (see [`panda_client::application::console`]).
//!
//! # Usage
//!
//! ```text
//! panda-client [OPTIONS]
//!
//! Options:
//!   --backend       <URL>   Backend base address [default: ws://localhost:3000]
//!   --path          <PATH>  WebSocket path suffix [default: /ws]
//!   --config        <FILE>  Optional TOML file with the same settings
//!   --cookie        <VALUE> Session cookie sent with the handshake
//!   --close-timeout <SECS>  Close handshake timeout [default: 5]
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable                  | Description                          |
//! |---------------------------|--------------------------------------|
//! | `PUBLIC_BACKEND_HOSTNAME` | Backend base address                 |
//! | `PANDA_WS_PATH`           | WebSocket path suffix                |
//! | `PANDA_CONFIG`            | TOML config file                     |
//! | `PANDA_SESSION_COOKIE`    | Session cookie (`session=...`)       |
//! | `RUST_LOG`                | Log filter, logs go to stderr        |
//!
//! Precedence is CLI flag, then environment variable, then config file, then
//! the built-in default.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use panda_client::application::console;
use panda_client::application::{ConnectionManager, Console, ConsoleCommand, Reply};
use panda_client::infrastructure::cookie::SessionCookie;
use panda_client::infrastructure::transport::websocket::WsConnector;
use panda_client::infrastructure::transport::MessageHandler;
use panda_core::{LinkConfig, MessageEvent, SessionState};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Panda Game real-time client.
///
/// Keeps one WebSocket connection to the backend and bridges it to the
/// terminal.
#[derive(Debug, Parser)]
#[command(
    name = "panda-client",
    about = "Terminal client for the Panda Game real-time channel",
    version
)]
struct Cli {
    /// Backend base address, e.g. `http://localhost:3000`.
    ///
    /// `http`/`https` are mapped to `ws`/`wss`.
    #[arg(long, env = "PUBLIC_BACKEND_HOSTNAME")]
    backend: Option<String>,

    /// Path of the message endpoint, appended to the backend address.
    #[arg(long, env = "PANDA_WS_PATH")]
    path: Option<String>,

    /// TOML file providing defaults for the settings above.
    #[arg(long, env = "PANDA_CONFIG")]
    config: Option<PathBuf>,

    /// Session cookie from the backend's `/login` or `/guest` response.
    #[arg(long, env = "PANDA_SESSION_COOKIE")]
    cookie: Option<String>,

    /// Seconds a local close waits for the server's Close frame.
    #[arg(long)]
    close_timeout: Option<u64>,
}

impl Cli {
    /// Merges the config file (if any) with the CLI/environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed, or if
    /// the resulting backend address is not a usable WebSocket URL.
    fn into_link_config(&self) -> anyhow::Result<LinkConfig> {
        let mut config = match &self.config {
            Some(path) => LinkConfig::load(path)
                .with_context(|| format!("failed to load config '{}'", path.display()))?,
            None => LinkConfig::default(),
        };

        if let Some(backend) = &self.backend {
            config.backend = backend.clone();
        }
        if let Some(path) = &self.path {
            config.path = path.clone();
        }
        if let Some(secs) = self.close_timeout {
            config.close_timeout_secs = secs;
        }

        config
            .endpoint()
            .with_context(|| format!("invalid backend address '{}'", config.backend))?;
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries messages, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.into_link_config()?;

    let cookie = SessionCookie::new();
    if let Some(value) = &cli.cookie {
        cookie.set(value).context("invalid --cookie value")?;
    }

    let connector = WsConnector::new(config.close_timeout())
        .context("failed to bind the WebSocket connector to the runtime")?
        .with_cookie(cookie.clone());
    let manager = Arc::new(
        ConnectionManager::new(&config, Arc::new(connector))
            .context("failed to create the connection manager")?,
    );

    let printer: MessageHandler = Arc::new(|event: &MessageEvent| println!("<< {event}"));
    let shell = Console::new(
        Arc::clone(&manager),
        Arc::new(SessionState::new()),
        cookie,
        printer,
    );
    shell.execute(ConsoleCommand::Subscribe)?;

    info!("panda-client ready, type /quit to exit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read stdin")?,
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl+C")?;
                info!("received Ctrl+C, closing");
                break;
            }
        };

        // EOF
        let Some(line) = line else { break };

        let command = match console::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                warn!("{e}");
                continue;
            }
        };

        match shell.execute(command) {
            Ok(Reply::Quiet) => {}
            Ok(Reply::Line(text)) => eprintln!("{text}"),
            Ok(Reply::Quit) => break,
            Err(e) => warn!("{e}"),
        }
    }

    manager.close();
    // Give the driver task a moment to finish the close handshake.
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    info!("panda-client stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
