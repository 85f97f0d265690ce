//! One-shot message submission over HTTP.
//!
//! [`HubClient`] sends without any persistent connection: each call is an
//! independent POST to the hub's message endpoint, correlated through the
//! `x-request-id` header. [`HubClient::send_with_retry`] layers the bounded
//! retry loop from [`crate::retry`] on top for hubs that rate-limit while
//! cold.

use reqwest::StatusCode;
use tracing::debug;

use crate::errors::{ClientError, Result};
use crate::retry::{self, RetryConfig};
use crate::types::{
    CODE_OK, CODE_RATE_LIMITED, ConnectionParams, OutgoingMessage, OutgoingMessageResponse,
};

/// Header carrying the correlation id on both request and response.
pub(crate) const REQUEST_ID_HEADER: &str = "x-request-id";

/// Stateless sender bound to one hub deployment and one client identity.
pub struct HubClient {
    params: ConnectionParams,
    http: reqwest::Client,
}

impl HubClient {
    /// Create a client with a default HTTP client.
    #[must_use]
    pub fn new(params: ConnectionParams) -> Self {
        Self {
            params,
            http: reqwest::Client::new(),
        }
    }

    /// Create a client with a caller-configured HTTP client, e.g. to set
    /// request timeouts.
    #[must_use]
    pub fn with_http_client(params: ConnectionParams, http: reqwest::Client) -> Self {
        Self { params, http }
    }

    /// Submit a message and wait for the hub's delivery report.
    ///
    /// The bound client id is asserted as the sender, replacing whatever the
    /// message carried. A rate-limit signal (HTTP 429 or a rate-limit body
    /// code) and any other non-OK code become errors; on success the
    /// response's correlation id is filled from the `x-request-id` response
    /// header when the body did not carry one.
    pub async fn send(&self, message: &OutgoingMessage) -> Result<OutgoingMessageResponse> {
        let mut message = message.clone();
        message.sender_id = self.params.client_id.clone();

        let url = self.params.message_url();
        debug!(url = %url, request_id = %message.request_id, "submitting message to hub");
        let response = self
            .http
            .post(&url)
            .header(REQUEST_ID_HEADER, message.request_id.as_str())
            .json(&message)
            .send()
            .await?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(ClientError::RateLimited {
                message: "hub returned http 429".to_string(),
            });
        }

        let header_request_id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        let mut decoded: OutgoingMessageResponse = response.json().await?;

        if decoded.code == CODE_RATE_LIMITED {
            return Err(ClientError::RateLimited {
                message: format!("hub returned code {CODE_RATE_LIMITED}"),
            });
        }
        if decoded.code != CODE_OK {
            return Err(ClientError::Rejected {
                code: decoded.code,
                reason: decoded.reason.unwrap_or_default(),
            });
        }

        if decoded.request_id.is_none() {
            decoded.request_id = header_request_id;
        }
        Ok(decoded)
    }

    /// Submit a message, retrying while the hub reports overload.
    ///
    /// Retry counting, the one-time overload warning, and the fixed backoff
    /// are described on [`retry::send_with_retry`].
    pub async fn send_with_retry(
        &self,
        message: &OutgoingMessage,
        config: &RetryConfig,
    ) -> Result<OutgoingMessageResponse> {
        retry::send_with_retry(config, || self.send(message)).await
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

    fn params_for(server: &wiremock::MockServer) -> ConnectionParams {
        ConnectionParams {
            client_id: "alice".to_string(),
            base_url: server.address().to_string(),
            tls_enabled: false,
        }
    }

    fn ok_body() -> serde_json::Value {
        json!({
            "code": "OK",
            "reason": "",
            "report": [{ "client_id": "bob", "code": "OK", "reason": "" }]
        })
    }

    // ── Success path ──

    #[tokio::test]
    async fn send_posts_the_message_with_correlation_header() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/api/message"))
            .and(wiremock::matchers::header("x-request-id", "r-1"))
            .and(wiremock::matchers::body_partial_json(json!({
                "sender_id": "alice",
                "receiver_ids": ["bob"],
                "message": "hello",
                "persist": "if_offline"
            })))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(ok_body()))
            .expect(1)
            .mount(&server)
            .await;

        let client = HubClient::new(params_for(&server));
        let message =
            OutgoingMessage::new(vec!["bob".to_string()], "hello").with_request_id("r-1");
        let response = client.send(&message).await.unwrap();

        assert_eq!(response.code, CODE_OK);
        assert_eq!(response.report.len(), 1);
        assert_eq!(response.report[0].client_id, "bob");
    }

    #[tokio::test]
    async fn send_asserts_the_bound_client_as_sender() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::body_partial_json(json!({ "sender_id": "alice" })))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(ok_body()))
            .expect(1)
            .mount(&server)
            .await;

        let client = HubClient::new(params_for(&server));
        let mut message = OutgoingMessage::new(vec!["bob".to_string()], "hello");
        message.sender_id = "mallory".to_string();
        let result = client.send(&message).await;

        assert!(result.is_ok());
        // the caller's copy is left alone
        assert_eq!(message.sender_id, "mallory");
    }

    // ── Correlation id recovery ──

    #[tokio::test]
    async fn header_fills_the_request_id_when_the_body_lacks_one() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .insert_header("x-request-id", "h-1")
                    .set_body_json(json!({ "code": "OK", "report": [] })),
            )
            .mount(&server)
            .await;

        let client = HubClient::new(params_for(&server));
        let message = OutgoingMessage::new(vec!["bob".to_string()], "hello");
        let response = client.send(&message).await.unwrap();

        assert_eq!(response.request_id.as_deref(), Some("h-1"));
    }

    #[tokio::test]
    async fn body_request_id_wins_over_the_header() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .insert_header("x-request-id", "h-1")
                    .set_body_json(json!({ "request_id": "b-1", "code": "OK", "report": [] })),
            )
            .mount(&server)
            .await;

        let client = HubClient::new(params_for(&server));
        let message = OutgoingMessage::new(vec!["bob".to_string()], "hello");
        let response = client.send(&message).await.unwrap();

        assert_eq!(response.request_id.as_deref(), Some("b-1"));
    }

    // ── Failure classification ──

    #[tokio::test]
    async fn non_ok_code_is_a_rejection() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(json!({
                "code": "RECEIVER_UNKNOWN",
                "reason": "no such client: bob",
                "report": []
            })))
            .mount(&server)
            .await;

        let client = HubClient::new(params_for(&server));
        let message = OutgoingMessage::new(vec!["bob".to_string()], "hello");
        let error = client.send(&message).await.unwrap_err();

        assert_matches!(
            &error,
            ClientError::Rejected { code, reason }
                if code == "RECEIVER_UNKNOWN" && reason == "no such client: bob"
        );
        assert_eq!(error.to_string(), "request failed: no such client: bob");
    }

    #[tokio::test]
    async fn http_429_is_rate_limited_before_body_decode() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(wiremock::ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = HubClient::new(params_for(&server));
        let message = OutgoingMessage::new(vec!["bob".to_string()], "hello");
        let error = client.send(&message).await.unwrap_err();

        assert!(error.is_rate_limit());
    }

    #[tokio::test]
    async fn rate_limit_body_code_is_rate_limited() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_json(json!({ "code": "RATE_LIMITED" })),
            )
            .mount(&server)
            .await;

        let client = HubClient::new(params_for(&server));
        let message = OutgoingMessage::new(vec!["bob".to_string()], "hello");
        let error = client.send(&message).await.unwrap_err();

        assert!(error.is_rate_limit());
    }

    #[tokio::test]
    async fn unparseable_body_is_an_http_error() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("warming up"))
            .mount(&server)
            .await;

        let client = HubClient::new(params_for(&server));
        let message = OutgoingMessage::new(vec!["bob".to_string()], "hello");
        let error = client.send(&message).await.unwrap_err();

        assert_matches!(error, ClientError::Http(_));
    }

    // ── Retrying ──

    #[tokio::test]
    async fn send_with_retry_recovers_after_a_cold_start() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(wiremock::ResponseTemplate::new(429))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(ok_body()))
            .expect(1)
            .mount(&server)
            .await;

        let client = HubClient::new(params_for(&server));
        let message = OutgoingMessage::new(vec!["bob".to_string()], "hello");
        let config = RetryConfig {
            max_attempts: 5,
            backoff_ms: 0,
        };
        let response = client.send_with_retry(&message, &config).await.unwrap();

        assert_eq!(response.code, CODE_OK);
    }

    #[tokio::test]
    async fn send_with_retry_exhausts_against_a_busy_hub() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(wiremock::ResponseTemplate::new(429))
            .expect(3)
            .mount(&server)
            .await;

        let client = HubClient::new(params_for(&server));
        let message = OutgoingMessage::new(vec!["bob".to_string()], "hello");
        let config = RetryConfig {
            max_attempts: 3,
            backoff_ms: 0,
        };
        let error = client.send_with_retry(&message, &config).await.unwrap_err();

        assert_matches!(
            error,
            ClientError::RetriesExhausted { attempts: 3, last } if last.is_rate_limit()
        );
    }
}
