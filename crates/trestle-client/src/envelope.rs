//! The tagged JSON envelope exchanged over a hub connection.
//!
//! Every text frame on the wire is one [`Envelope`]: a `type` tag, an
//! optional correlation id, and an opaque `body` whose shape depends on the
//! tag. Decoding is two-phase: the envelope is decoded first with the body
//! left as raw JSON, then the body is decoded into the concrete payload type
//! for the tag. The codec never validates business rules.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::DecodeError;
use crate::types::{IncomingMessage, OutgoingMessage, OutgoingMessageResponse};

/// Tag for a message the hub pushes to this client.
pub const TYPE_INCOMING_MESSAGE: &str = "INCOMING_MESSAGE";
/// Tag for a message submitted to the hub over the connection.
pub const TYPE_OUTGOING_MESSAGE: &str = "OUTGOING_MESSAGE";
/// Tag for the hub's delivery report for an earlier outgoing message.
pub const TYPE_OUTGOING_MESSAGE_RESPONSE: &str = "OUTGOING_MESSAGE_RESPONSE";
/// Tag for a hub-side failure with no sender attribution.
pub const TYPE_ERROR_RESPONSE: &str = "ERROR_RESPONSE";

/// One wire frame on the persistent connection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Type tag selecting the body shape.
    #[serde(rename = "type")]
    pub kind: String,
    /// Correlation id joining a request to its eventual response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Tag-dependent payload, kept opaque until the tag is known.
    #[serde(default)]
    pub body: Value,
}

impl Envelope {
    /// Wrap an outgoing message for transmission on a connection.
    ///
    /// The correlation id rides on the envelope; the body never carries it.
    pub fn outgoing(message: &OutgoingMessage) -> Result<Self, serde_json::Error> {
        Ok(Self {
            kind: TYPE_OUTGOING_MESSAGE.to_string(),
            request_id: Some(message.request_id.clone()),
            body: serde_json::to_value(message)?,
        })
    }

    /// Decode one text frame, leaving the body opaque.
    pub fn decode(raw: &str) -> Result<Self, DecodeError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Serialize the envelope to its wire form.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode the body as an incoming message.
    ///
    /// The envelope's correlation id is stamped onto the payload when the
    /// body did not carry one.
    pub fn into_incoming_message(self) -> Result<IncomingMessage, DecodeError> {
        let mut message: IncomingMessage = serde_json::from_value(self.body)?;
        if message.request_id.is_none() {
            message.request_id = self.request_id;
        }
        Ok(message)
    }

    /// Decode the body as a delivery response.
    ///
    /// The envelope's correlation id is stamped onto the payload when the
    /// body did not carry one.
    pub fn into_response(self) -> Result<OutgoingMessageResponse, DecodeError> {
        let mut response: OutgoingMessageResponse = serde_json::from_value(self.body)?;
        if response.request_id.is_none() {
            response.request_id = self.request_id;
        }
        Ok(response)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    // ── Phase 1 ──

    #[test]
    fn round_trips_a_well_formed_envelope() {
        let envelope = Envelope {
            kind: TYPE_INCOMING_MESSAGE.to_string(),
            request_id: Some("r-1".to_string()),
            body: json!({ "sender_id": "bob", "message": "hi" }),
        };
        let decoded = Envelope::decode(&envelope.encode().unwrap()).unwrap();
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn body_stays_opaque_until_phase_two() {
        let decoded = Envelope::decode(
            r#"{"type":"OUTGOING_MESSAGE_RESPONSE","request_id":"r-9","body":[1,2,3]}"#,
        )
        .unwrap();
        assert_eq!(decoded.kind, TYPE_OUTGOING_MESSAGE_RESPONSE);
        assert_eq!(decoded.body, json!([1, 2, 3]));
    }

    #[test]
    fn unknown_envelope_fields_are_tolerated() {
        let decoded =
            Envelope::decode(r#"{"type":"INCOMING_MESSAGE","body":{},"hop_count":3}"#).unwrap();
        assert_eq!(decoded.kind, TYPE_INCOMING_MESSAGE);
        assert_eq!(decoded.request_id, None);
    }

    #[test]
    fn invalid_json_is_malformed() {
        assert_matches!(Envelope::decode("{not json"), Err(DecodeError::Malformed(_)));
    }

    #[test]
    fn missing_tag_is_malformed() {
        assert_matches!(
            Envelope::decode(r#"{"request_id":"r-1","body":{}}"#),
            Err(DecodeError::Malformed(_))
        );
    }

    #[test]
    fn absent_request_id_is_not_serialized() {
        let envelope = Envelope {
            kind: TYPE_ERROR_RESPONSE.to_string(),
            request_id: None,
            body: Value::Null,
        };
        let raw = envelope.encode().unwrap();
        assert!(!raw.contains("request_id"));
    }

    // ── Phase 2 ──

    #[test]
    fn incoming_payload_takes_the_envelope_id() {
        let envelope = Envelope {
            kind: TYPE_INCOMING_MESSAGE.to_string(),
            request_id: Some("r-2".to_string()),
            body: json!({ "sender_id": "bob", "message": "hi" }),
        };
        let message = envelope.into_incoming_message().unwrap();
        assert_eq!(message.request_id.as_deref(), Some("r-2"));
        assert_eq!(message.sender_id, "bob");
        assert_eq!(message.message, "hi");
    }

    #[test]
    fn body_carried_id_wins_over_envelope_id() {
        let envelope = Envelope {
            kind: TYPE_INCOMING_MESSAGE.to_string(),
            request_id: Some("outer".to_string()),
            body: json!({ "request_id": "inner", "sender_id": "bob", "message": "hi" }),
        };
        let message = envelope.into_incoming_message().unwrap();
        assert_eq!(message.request_id.as_deref(), Some("inner"));
    }

    #[test]
    fn response_payload_takes_the_envelope_id() {
        let envelope = Envelope {
            kind: TYPE_OUTGOING_MESSAGE_RESPONSE.to_string(),
            request_id: Some("r-3".to_string()),
            body: json!({ "code": "OK", "report": [] }),
        };
        let response = envelope.into_response().unwrap();
        assert_eq!(response.request_id.as_deref(), Some("r-3"));
        assert_eq!(response.code, "OK");
    }

    #[test]
    fn mismatched_body_shape_is_malformed() {
        let envelope = Envelope {
            kind: TYPE_INCOMING_MESSAGE.to_string(),
            request_id: None,
            body: json!(42),
        };
        assert_matches!(
            envelope.into_incoming_message(),
            Err(DecodeError::Malformed(_))
        );
    }

    // ── Encoding outgoing messages ──

    #[test]
    fn outgoing_wraps_the_id_in_the_envelope_only() {
        let message = OutgoingMessage::new(vec!["bob".to_string()], "hello")
            .with_request_id("r-4");
        let envelope = Envelope::outgoing(&message).unwrap();

        assert_eq!(envelope.kind, TYPE_OUTGOING_MESSAGE);
        assert_eq!(envelope.request_id.as_deref(), Some("r-4"));
        assert!(envelope.body.get("request_id").is_none());
        assert_eq!(envelope.body["receiver_ids"], json!(["bob"]));
        assert_eq!(envelope.body["message"], json!("hello"));
    }
}
