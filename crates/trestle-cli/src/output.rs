//! Console formatting for messages and delivery reports.
//!
//! Formatters are pure so tests can pin the timestamp; the commands wrap
//! them in `println!`.

use chrono::{DateTime, Local};
use trestle_client::{ClientError, IncomingMessage, OutgoingMessageResponse};

/// Format one pushed message, or a read failure, for the console.
///
/// `>> [3:04PM] sender: text`
#[must_use]
pub fn format_incoming(
    incoming: &Result<IncomingMessage, ClientError>,
    now: DateTime<Local>,
) -> String {
    let stamp = now.format("%-I:%M%p");
    match incoming {
        Ok(message) => format!(">> [{stamp}] {}: {}", message.sender_id, message.message),
        Err(error) => format!(">> [{stamp}] failed to read a message: {error}"),
    }
}

/// Format the per-receiver delivery report of an accepted send.
#[must_use]
pub fn format_report(response: &OutgoingMessageResponse) -> String {
    if response.report.is_empty() {
        return "accepted, no per-receiver report".to_string();
    }

    let lines: Vec<String> = response
        .report
        .iter()
        .map(|entry| {
            match entry.reason.as_deref().filter(|reason| !reason.is_empty()) {
                Some(reason) => format!("{}: {} ({reason})", entry.client_id, entry.code),
                None => format!("{}: {}", entry.client_id, entry.code),
            }
        })
        .collect();
    lines.join("\n")
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
