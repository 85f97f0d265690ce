//! # trestle-cli
//!
//! Command-line client for the Trestle message hub: stream messages with
//! `trestle connect`, submit them with `trestle send`.

#![deny(unsafe_code)]

mod commands;
mod output;
mod settings;
mod validate;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "trestle", version, about = "Client for the Trestle message hub")]
struct Cli {
    /// Settings file to use instead of ~/.trestle/settings.json.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Client identity to act as, overriding the settings file.
    #[arg(long, global = true, value_name = "ID")]
    client_id: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Connect and stream messages addressed to this client.
    Connect,
    /// Send a message and print the delivery report.
    Send {
        /// Receiver client id; repeat the flag for several receivers.
        #[arg(short, long = "to", value_name = "ID", required = true)]
        to: Vec<String>,
        /// When the hub should store the message: always, never or if-offline.
        #[arg(long, default_value = "if-offline", value_name = "MODE")]
        persist: String,
        /// The message text.
        message: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging("warn");

    let cli = Cli::parse();
    let settings = match &cli.config {
        Some(path) => settings::load_from_path(path),
        None => settings::load(),
    }
    .context("failed to load settings")?;

    let client_id = cli
        .client_id
        .or_else(|| settings.client_id.clone())
        .context("no client id: pass --client-id or set clientId in the settings file")?;
    validate::check_client_id(&client_id)?;

    let params = settings.hub.params(client_id);

    match cli.command {
        Command::Connect => commands::connect::run(params).await,
        Command::Send {
            to,
            persist,
            message,
        } => commands::send::run(params, &settings.send, to, &persist, message).await,
    }
}

fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact();

    // set_global_default is a no-op if already set
    let _ = subscriber.try_init();
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
