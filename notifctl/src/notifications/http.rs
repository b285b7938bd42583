//! Outbound HTTP client abstraction.
//!
//! The delivery engine only needs "POST this JSON to that URL within this timeout". The
//! [`HttpClient`] trait captures exactly that so delivery logic can be exercised against
//! [`MockHttpClient`] without a network.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Response from a delivered HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Why a single delivery attempt got no response.
///
/// Any HTTP response, whatever its status, counts as delivered.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// Connection, DNS, TLS or protocol failure
    #[error("transport error: {0}")]
    Transport(String),

    /// No response within the request timeout
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

/// Trait for POSTing JSON bodies to webhook endpoints.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// POST `body` as JSON to `url`.
    ///
    /// Any HTTP response (whatever its status) is returned as `Ok`; only failures to obtain a
    /// response are errors.
    async fn post_json(&self, url: &str, body: &serde_json::Value, timeout: Duration) -> Result<HttpResponse, DeliveryError>;
}

// ============================================================================
// Production Implementation using reqwest
// ============================================================================

/// Merchant response bodies are only logged, so at most this much is read.
pub const MAX_RESPONSE_BODY_BYTES: usize = 4096;

/// Read up to `limit` bytes of the body. A body that fails midway keeps what was read.
async fn read_capped_body(mut response: reqwest::Response, limit: usize) -> String {
    let mut buf = Vec::new();
    while buf.len() < limit {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                let take = chunk.len().min(limit - buf.len());
                buf.extend_from_slice(&chunk[..take]);
            }
            Ok(None) | Err(_) => break,
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Production HTTP client using reqwest.
#[derive(Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    /// Build a client whose overall timeout defaults to `timeout`.
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    #[tracing::instrument(skip(self, body), fields(url = %url))]
    async fn post_json(&self, url: &str, body: &serde_json::Value, timeout: Duration) -> Result<HttpResponse, DeliveryError> {
        let response = self
            .client
            .post(url)
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DeliveryError::Timeout(timeout)
                } else {
                    DeliveryError::Transport(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let body = read_capped_body(response, MAX_RESPONSE_BODY_BYTES).await;

        tracing::debug!(status, response_len = body.len(), "Webhook endpoint responded");
        Ok(HttpResponse { status, body })
    }
}

// ============================================================================
// Test/Mock Implementation
// ============================================================================

#[cfg(any(test, feature = "test-utils"))]
pub use mock::{MockCall, MockHttpClient};

#[cfg(any(test, feature = "test-utils"))]
mod mock {
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tokio::time::Instant;

    use super::{DeliveryError, HttpClient, HttpResponse};

    /// Record of a call made to the mock HTTP client.
    #[derive(Debug, Clone)]
    pub struct MockCall {
        pub url: String,
        pub body: serde_json::Value,
        pub timeout: Duration,
        pub at: Instant,
    }

    /// Mock HTTP client returning scripted outcomes in FIFO order.
    ///
    /// Once the script is exhausted every call succeeds with `200 OK`.
    ///
    /// # Example
    /// ```ignore
    /// let mock = MockHttpClient::new();
    /// mock.push_status(500);
    /// mock.push_error(DeliveryError::Transport("connection refused".into()));
    /// // third and later calls return 200
    /// ```
    #[derive(Clone, Default)]
    pub struct MockHttpClient {
        outcomes: Arc<Mutex<VecDeque<Result<HttpResponse, DeliveryError>>>>,
        calls: Arc<Mutex<Vec<MockCall>>>,
    }

    impl MockHttpClient {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a response with the given status code.
        pub fn push_status(&self, status: u16) {
            self.outcomes.lock().push_back(Ok(HttpResponse {
                status,
                body: String::new(),
            }));
        }

        /// Queue a failure to obtain any response.
        pub fn push_error(&self, error: DeliveryError) {
            self.outcomes.lock().push_back(Err(error));
        }

        /// Get all calls that have been made to this mock client.
        pub fn calls(&self) -> Vec<MockCall> {
            self.calls.lock().clone()
        }

        /// Get the number of calls made.
        pub fn call_count(&self) -> usize {
            self.calls.lock().len()
        }
    }

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn post_json(&self, url: &str, body: &serde_json::Value, timeout: Duration) -> Result<HttpResponse, DeliveryError> {
            self.calls.lock().push(MockCall {
                url: url.to_string(),
                body: body.clone(),
                timeout,
                at: Instant::now(),
            });

            self.outcomes.lock().pop_front().unwrap_or(Ok(HttpResponse {
                status: 200,
                body: String::new(),
            }))
        }
    }
}
