//! The persistent hub connection and its inbound dispatch loop.
//!
//! One [`Connection`] is one WebSocket stream bound to one client identity.
//! A single task spawned at connect time reads every inbound frame and routes
//! it to one of three handler slots fixed at construction: pushed messages
//! and dispatch errors go to the message handler, delivery responses to the
//! response handler, and the close handler fires exactly once when the
//! stream ends.

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use crate::envelope::{
    Envelope, TYPE_ERROR_RESPONSE, TYPE_INCOMING_MESSAGE, TYPE_OUTGOING_MESSAGE_RESPONSE,
};
use crate::errors::{ClientError, CloseReason, DecodeError, Result};
use crate::types::{ConnectionParams, IncomingMessage, OutgoingMessage, OutgoingMessageResponse};

/// Header presenting the client identity during the handshake.
pub(crate) const CLIENT_ID_HEADER: &str = "x-client-id";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Handler for messages pushed by the hub and for dispatch-surfaced errors.
pub type MessageHandler = Box<dyn FnMut(Result<IncomingMessage>) + Send>;
/// Handler for delivery responses to earlier async sends.
pub type ResponseHandler = Box<dyn FnMut(OutgoingMessageResponse) + Send>;
/// Handler invoked exactly once when the connection ends.
pub type CloseHandler = Box<dyn FnOnce(CloseReason) + Send>;

struct Handlers {
    on_message: MessageHandler,
    on_response: ResponseHandler,
    on_close: CloseHandler,
}

/// Builder installing handlers before the connection dials.
///
/// All three slots default to no-ops. Handlers are fixed once
/// [`connect`](Self::connect) runs; a live connection cannot swap them.
pub struct ConnectionBuilder {
    params: ConnectionParams,
    handlers: Handlers,
}

impl ConnectionBuilder {
    fn new(params: ConnectionParams) -> Self {
        Self {
            params,
            handlers: Handlers {
                on_message: Box::new(|_| {}),
                on_response: Box::new(|_| {}),
                on_close: Box::new(|_| {}),
            },
        }
    }

    /// Set the handler for pushed messages and dispatch errors.
    ///
    /// Handlers run inline on the dispatch task, so a slow handler delays
    /// every frame behind it.
    #[must_use]
    pub fn with_message_handler<F>(mut self, handler: F) -> Self
    where
        F: FnMut(Result<IncomingMessage>) + Send + 'static,
    {
        self.handlers.on_message = Box::new(handler);
        self
    }

    /// Set the handler for delivery responses to async sends.
    #[must_use]
    pub fn with_response_handler<F>(mut self, handler: F) -> Self
    where
        F: FnMut(OutgoingMessageResponse) + Send + 'static,
    {
        self.handlers.on_response = Box::new(handler);
        self
    }

    /// Set the handler fired exactly once when the connection ends.
    #[must_use]
    pub fn with_close_handler<F>(mut self, handler: F) -> Self
    where
        F: FnOnce(CloseReason) + Send + 'static,
    {
        self.handlers.on_close = Box::new(handler);
        self
    }

    /// Dial the hub and spawn the dispatch loop.
    pub async fn connect(self) -> Result<Connection> {
        let url = self.params.bridge_url();
        let mut request =
            url.as_str()
                .into_client_request()
                .map_err(|e| ClientError::Connect {
                    url: url.clone(),
                    source: e,
                })?;
        let client_id =
            HeaderValue::from_str(&self.params.client_id).map_err(|e| ClientError::Connect {
                url: url.clone(),
                source: tungstenite::Error::HttpFormat(e.into()),
            })?;
        let _ = request.headers_mut().insert(CLIENT_ID_HEADER, client_id);

        let (stream, _) = connect_async(request)
            .await
            .map_err(|e| ClientError::Connect {
                url: url.clone(),
                source: e,
            })?;
        info!(url = %url, client_id = %self.params.client_id, "connected to hub");

        let (writer, reader) = stream.split();
        let reader_task = tokio::spawn(dispatch_loop(reader, self.handlers));

        Ok(Connection {
            params: self.params,
            writer: Mutex::new(writer),
            reader_task,
        })
    }
}

/// A live connection to the hub, bound to one client identity.
///
/// Owns the write half of the stream; the read half belongs to the dispatch
/// task spawned at connect time. Dropping the connection aborts that task,
/// so prefer [`close`](Self::close) when the close handler should observe a
/// clean shutdown.
pub struct Connection {
    params: ConnectionParams,
    writer: Mutex<SplitSink<WsStream, Message>>,
    reader_task: JoinHandle<()>,
}

impl Connection {
    /// Start building a connection with the three handler slots open.
    #[must_use]
    pub fn builder(params: ConnectionParams) -> ConnectionBuilder {
        ConnectionBuilder::new(params)
    }

    /// Dial the hub with no-op handlers, for send-only use.
    pub async fn connect(params: ConnectionParams) -> Result<Self> {
        Self::builder(params).connect().await
    }

    /// The parameters this connection was dialed with.
    #[must_use]
    pub fn params(&self) -> &ConnectionParams {
        &self.params
    }

    /// Submit a message over the connection without waiting for an outcome.
    ///
    /// Writes one text frame carrying the message's correlation id on the
    /// envelope. The hub answers later with a delivery-response frame under
    /// the same id, routed to the response handler. The sender id travels as
    /// the caller set it; the hub already knows this connection's identity
    /// from the handshake header.
    pub async fn send_async(&self, message: &OutgoingMessage) -> Result<()> {
        let envelope = Envelope::outgoing(message).map_err(ClientError::Encode)?;
        let text = envelope.encode().map_err(ClientError::Encode)?;
        debug!(
            request_id = %message.request_id,
            receivers = message.receiver_ids.len(),
            "sending message on connection"
        );
        let mut writer = self.writer.lock().await;
        writer
            .send(Message::Text(text.into()))
            .await
            .map_err(ClientError::Send)
    }

    /// Start the closing handshake.
    ///
    /// The close handler fires from the dispatch loop when it observes the
    /// stream end, not from this method. Closing twice surfaces an error
    /// without panicking or corrupting state.
    pub async fn close(&self) -> Result<()> {
        let mut writer = self.writer.lock().await;
        writer.close().await.map_err(ClientError::Send)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.reader_task.abort();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Dispatch loop
// ─────────────────────────────────────────────────────────────────────────────

async fn dispatch_loop(mut reader: SplitStream<WsStream>, mut handlers: Handlers) {
    let reason = read_frames(&mut reader, &mut handlers).await;
    match &reason {
        CloseReason::Closed => debug!("hub connection closed"),
        CloseReason::Failed(error) => warn!(error = %error, "hub connection failed"),
    }
    (handlers.on_close)(reason);
}

/// Read frames in arrival order until the stream ends.
///
/// Handler invocations happen inline, so dispatch order equals read order.
/// Decode failures are surfaced through the message handler and never stop
/// the loop; only the stream ending does.
async fn read_frames(reader: &mut SplitStream<WsStream>, handlers: &mut Handlers) -> CloseReason {
    loop {
        match reader.next().await {
            Some(Ok(Message::Text(text))) => dispatch_text(text.as_str(), handlers),
            Some(Ok(Message::Close(_))) => return CloseReason::Closed,
            // Binary, ping and pong frames carry no envelopes.
            Some(Ok(_)) => {}
            Some(Err(error)) => return CloseReason::Failed(ClientError::Transport(error)),
            None => return CloseReason::Closed,
        }
    }
}

/// Route one text frame to a handler based on its envelope tag.
fn dispatch_text(text: &str, handlers: &mut Handlers) {
    let envelope = match Envelope::decode(text) {
        Ok(envelope) => envelope,
        Err(error) => {
            warn!(error = %error, "failed to decode hub frame");
            (handlers.on_message)(Err(error.into()));
            return;
        }
    };

    match envelope.kind.as_str() {
        TYPE_INCOMING_MESSAGE => match envelope.into_incoming_message() {
            Ok(message) => (handlers.on_message)(Ok(message)),
            Err(error) => (handlers.on_message)(Err(error.into())),
        },
        TYPE_OUTGOING_MESSAGE_RESPONSE => match envelope.into_response() {
            Ok(response) => (handlers.on_response)(response),
            // A response body that fails to decode is surfaced on the message
            // handler; the response handler only ever sees well-formed data.
            Err(error) => (handlers.on_message)(Err(error.into())),
        },
        TYPE_ERROR_RESPONSE => (handlers.on_message)(Err(ClientError::Hub)),
        _ => {
            warn!(kind = %envelope.kind, "received frame with unrecognized type");
            (handlers.on_message)(Err(DecodeError::UnknownType(envelope.kind).into()));
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
