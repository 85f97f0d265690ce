//! # trestle-client
//!
//! Client library for the Trestle message hub.
//!
//! - [`Connection`]: one WebSocket stream bound to a client identity, with
//!   three handler slots fixed at construction and a single dispatch task
//!   routing every inbound frame in arrival order.
//! - [`HubClient`]: stateless one-shot sends over HTTP, correlated through
//!   the `x-request-id` header, with [`HubClient::send_with_retry`] absorbing
//!   cold-start rate limits.
//! - [`envelope`]: the tagged JSON envelope and its two-phase codec.
//!
//! ```no_run
//! use trestle_client::{Connection, ConnectionParams, HubClient, OutgoingMessage};
//!
//! # async fn demo() -> trestle_client::Result<()> {
//! let params = ConnectionParams {
//!     client_id: "alice".to_string(),
//!     base_url: "hub.example.com".to_string(),
//!     tls_enabled: true,
//! };
//!
//! let connection = Connection::builder(params.clone())
//!     .with_message_handler(|incoming| {
//!         if let Ok(message) = incoming {
//!             println!("{}: {}", message.sender_id, message.message);
//!         }
//!     })
//!     .connect()
//!     .await?;
//!
//! let report = HubClient::new(params)
//!     .send(&OutgoingMessage::new(vec!["bob".to_string()], "hi"))
//!     .await?;
//! # let _ = report;
//! # connection.close().await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod connection;
pub mod envelope;
pub mod errors;
pub mod retry;
pub mod send;
pub mod types;

pub use connection::{
    CloseHandler, Connection, ConnectionBuilder, MessageHandler, ResponseHandler,
};
pub use errors::{ClientError, CloseReason, DecodeError, Result};
pub use retry::RetryConfig;
pub use send::HubClient;
pub use types::{
    ConnectionParams, DeliveryResult, IncomingMessage, OutgoingMessage, OutgoingMessageResponse,
    Persistence, new_request_id,
};
