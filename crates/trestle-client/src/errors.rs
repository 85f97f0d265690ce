//! Error types for hub connections and sends.

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors surfaced by connections, dispatch, and the send paths.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The WebSocket dial to the hub failed.
    #[error("failed to connect to the hub at {url}")]
    Connect {
        /// The endpoint that was dialed.
        url: String,
        /// The underlying handshake failure.
        #[source]
        source: tungstenite::Error,
    },

    /// A frame could not be decoded into an envelope or payload.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A message could not be serialized for the wire.
    #[error("failed to encode message")]
    Encode(#[source] serde_json::Error),

    /// A frame could not be written to the open connection.
    #[error("failed to write to the hub connection")]
    Send(#[source] tungstenite::Error),

    /// The underlying stream failed mid-connection.
    #[error("the hub connection failed")]
    Transport(#[source] tungstenite::Error),

    /// The HTTP round trip to the hub failed.
    #[error("hub request failed")]
    Http(#[from] reqwest::Error),

    /// The hub rejected the request before attempting delivery.
    #[error("request failed: {reason}")]
    Rejected {
        /// Hub status code on the response body.
        code: String,
        /// Human-readable reason from the hub.
        reason: String,
    },

    /// The hub signaled overload, with HTTP 429 or a rate-limit body code.
    #[error("hub overloaded: {message}")]
    RateLimited {
        /// Description of the overload signal.
        message: String,
    },

    /// The hub pushed an error frame with no sender attribution.
    #[error("the hub reported an unspecified error")]
    Hub,

    /// Every retry attempt failed.
    #[error("server busy, retries exhausted after {attempts} attempts")]
    RetriesExhausted {
        /// Total attempts made.
        attempts: u32,
        /// The error from the final attempt.
        #[source]
        last: Box<ClientError>,
    },
}

impl ClientError {
    /// Whether this error is the hub's overload signal.
    ///
    /// [`crate::HubClient::send_with_retry`] pauses before the next attempt
    /// when this returns `true`; other errors are retried without a pause.
    #[must_use]
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

/// Errors from decoding a hub frame.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The frame was not a valid envelope, or its body did not match the
    /// shape implied by the type tag.
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The envelope carried a type tag this client does not recognize.
    #[error("unrecognized envelope type {0:?}")]
    UnknownType(String),
}

/// Why a connection's dispatch loop stopped.
#[derive(Debug)]
pub enum CloseReason {
    /// The stream ended with a clean closing handshake.
    Closed,
    /// The transport failed before a clean close.
    Failed(ClientError),
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
