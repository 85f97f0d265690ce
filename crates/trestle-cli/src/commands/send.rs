//! The `send` subcommand.

use anyhow::{Context, Result, bail};
use trestle_client::{ConnectionParams, HubClient, OutgoingMessage, Persistence, RetryConfig};

use crate::output;

/// Submit one message and print the hub's delivery report.
pub async fn run(
    params: ConnectionParams,
    retry: &RetryConfig,
    receivers: Vec<String>,
    persist: &str,
    message: String,
) -> Result<()> {
    let persist = parse_persistence(persist)?;
    let outgoing = OutgoingMessage::new(receivers, message).with_persistence(persist);

    let client = HubClient::new(params);
    let response = client
        .send_with_retry(&outgoing, retry)
        .await
        .context("the hub did not accept the message")?;

    println!("{}", output::format_report(&response));
    Ok(())
}

/// Map the command-line persistence flag onto the wire directive.
fn parse_persistence(value: &str) -> Result<Persistence> {
    match value {
        "always" => Ok(Persistence::Always),
        "never" => Ok(Persistence::Never),
        "if-offline" => Ok(Persistence::IfOffline),
        other => bail!("unknown persistence mode {other:?} (expected always, never or if-offline)"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
