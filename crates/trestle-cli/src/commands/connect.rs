//! The `connect` subcommand.

use anyhow::{Context, Result};
use chrono::Local;
use tokio::sync::oneshot;
use trestle_client::{CloseReason, Connection, ConnectionParams};

use crate::output;

/// Stream messages addressed to this client until interrupted.
///
/// Runs until Ctrl-C (then closes cleanly) or until the hub ends the
/// stream; a transport failure becomes a non-zero exit.
pub async fn run(params: ConnectionParams) -> Result<()> {
    let (close_tx, close_rx) = oneshot::channel();

    let connection = Connection::builder(params.clone())
        .with_message_handler(|incoming| {
            println!("{}", output::format_incoming(&incoming, Local::now()));
        })
        .with_close_handler(move |reason| {
            let _ = close_tx.send(reason);
        })
        .connect()
        .await
        .with_context(|| format!("could not reach the hub at {}", params.base_url))?;

    println!("connected to {} as {}", params.base_url, params.client_id);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            connection.close().await.context("failed to close the connection")?;
            println!("disconnected");
        }
        reason = close_rx => match reason {
            Ok(CloseReason::Failed(error)) => {
                return Err(error).context("the hub connection ended");
            }
            Ok(CloseReason::Closed) | Err(_) => println!("connection closed by the hub"),
        },
    }

    Ok(())
}
