//! Message payloads, connection parameters, and hub status codes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status code on a response whose request was accepted.
pub const CODE_OK: &str = "OK";
/// Status code on a response whose request hit the hub's rate limit.
pub const CODE_RATE_LIMITED: &str = "RATE_LIMITED";

/// Generate a fresh correlation id.
///
/// UUIDv7: time-ordered, so ids sort by creation time in hub logs.
#[must_use]
pub fn new_request_id() -> String {
    Uuid::now_v7().to_string()
}

/// Parameters binding a client identity to one hub deployment.
///
/// Immutable once a connection or client is created. `tls_enabled` selects
/// `wss`/`ws` for the persistent connection and `https`/`http` for one-shot
/// sends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionParams {
    /// Identity this client presents to the hub. Messages addressed to this
    /// id are routed to every connection that presented it.
    pub client_id: String,
    /// Host (and optional port) of the hub deployment, without a scheme.
    pub base_url: String,
    /// Whether the deployment terminates TLS.
    pub tls_enabled: bool,
}

impl ConnectionParams {
    /// WebSocket endpoint for the persistent connection.
    pub(crate) fn bridge_url(&self) -> String {
        let scheme = if self.tls_enabled { "wss" } else { "ws" };
        format!("{scheme}://{}/api/bridge", self.base_url)
    }

    /// HTTP endpoint for one-shot message submission.
    pub(crate) fn message_url(&self) -> String {
        let scheme = if self.tls_enabled { "https" } else { "http" };
        format!("{scheme}://{}/api/message", self.base_url)
    }
}

/// What the hub does with a message whose receiver cannot take it now.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Persistence {
    /// Store the message regardless of the receiver's connection state.
    #[serde(rename = "true")]
    Always,
    /// Never store the message; offline receivers miss it permanently.
    #[serde(rename = "false")]
    Never,
    /// Store the message only when the receiver has no live connection.
    #[default]
    #[serde(rename = "if_offline")]
    IfOffline,
}

/// A message pushed to this client over a connection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IncomingMessage {
    /// Correlation id, stamped from the enclosing envelope when the body
    /// does not carry one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Identity of the sending client.
    pub sender_id: String,
    /// Message content.
    pub message: String,
    /// Persistence directive the sender chose.
    #[serde(default)]
    pub persist: Persistence,
}

/// A message to submit to the hub.
///
/// The correlation id never travels in the JSON body. The send paths carry
/// it in the envelope or the `x-request-id` header instead.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    /// Correlation id joining this message to its eventual response.
    #[serde(skip)]
    pub request_id: String,
    /// Identity of the sender. [`crate::HubClient::send`] overwrites this
    /// with the client id it was built with.
    #[serde(default)]
    pub sender_id: String,
    /// Clients this message is addressed to.
    pub receiver_ids: Vec<String>,
    /// Message content.
    pub message: String,
    /// What the hub should do when a receiver is offline.
    #[serde(default)]
    pub persist: Persistence,
}

impl OutgoingMessage {
    /// Create a message with a fresh correlation id.
    #[must_use]
    pub fn new(receiver_ids: Vec<String>, message: impl Into<String>) -> Self {
        Self {
            request_id: new_request_id(),
            sender_id: String::new(),
            receiver_ids,
            message: message.into(),
            persist: Persistence::default(),
        }
    }

    /// Replace the generated correlation id.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    /// Set the persistence directive.
    #[must_use]
    pub fn with_persistence(mut self, persist: Persistence) -> Self {
        self.persist = persist;
        self
    }
}

/// The hub's verdict on one outgoing message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutgoingMessageResponse {
    /// Correlation id of the message this responds to. Filled from the
    /// envelope or the `x-request-id` header when absent from the body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// [`CODE_OK`] when the request was accepted; any other value means
    /// delivery was not attempted.
    pub code: String,
    /// Why the request was not processable, when it was not.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Delivery outcome for each receiver.
    #[serde(default)]
    pub report: Vec<DeliveryResult>,
}

/// Delivery outcome for a single receiver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeliveryResult {
    /// The receiver this entry describes.
    pub client_id: String,
    /// Specific connection of the receiver, when the hub reports
    /// per-connection outcomes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bridge_id: Option<String>,
    /// Final delivery status for this receiver.
    pub code: String,
    /// Why delivery failed, when it did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
