//! Delivery of a single notification with bounded, fixed-delay retry.
//!
//! ```text
//! Initial ──ok──────────────────────────────► Delivered { attempts: 1 }
//!    │
//!    └─fail─► Retrying { retry: 1 } ──ok────► Delivered { attempts: 2 }
//!                 │ (wait retry_delay)
//!                 └─fail─► Retrying { retry: 2 } ... Retrying { retry: N } ──fail──► Exhausted { attempts: N + 1 }
//! ```
//!
//! The initial attempt is not counted against the retry budget `N`, so a delivery makes at
//! most `N + 1` calls. Every call is bounded by the request timeout and every wait before a
//! retry races the shutdown token.

use std::time::Duration;

use metrics::counter;
use tokio_util::sync::CancellationToken;

use crate::config::NotificationConfig;
use crate::notifications::http::{DeliveryError, HttpClient};

/// Timing and budget for a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Upper bound for each outbound call
    pub request_timeout: Duration,
    /// Number of retries after the initial attempt
    pub retry_attempts: u32,
    /// Fixed wait before each retry
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            retry_attempts: 4,
            retry_delay: Duration::from_secs(5),
        }
    }
}

impl From<&NotificationConfig> for RetryPolicy {
    fn from(config: &NotificationConfig) -> Self {
        Self {
            request_timeout: config.request_timeout,
            retry_attempts: config.retry_attempts,
            retry_delay: config.retry_delay,
        }
    }
}

/// Position of a delivery in its retry sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    /// No call made yet
    Initial,
    /// The initial attempt failed; `retry` is the 1-based number of the next retry
    Retrying { retry: u32 },
    /// A call succeeded after `attempts` calls in total
    Delivered { attempts: u32 },
    /// Every call failed; `attempts` calls were made
    Exhausted { attempts: u32 },
}

impl DeliveryState {
    /// Transition after a call has completed.
    ///
    /// Terminal states are absorbing.
    pub fn advance(self, succeeded: bool, retry_budget: u32) -> Self {
        let attempts = match self {
            DeliveryState::Initial => 1,
            DeliveryState::Retrying { retry } => retry + 1,
            terminal => return terminal,
        };

        if succeeded {
            DeliveryState::Delivered { attempts }
        } else if attempts > retry_budget {
            DeliveryState::Exhausted { attempts }
        } else {
            DeliveryState::Retrying { retry: attempts }
        }
    }

    /// Number of calls made so far.
    pub fn calls_made(&self) -> u32 {
        match self {
            DeliveryState::Initial => 0,
            DeliveryState::Retrying { retry } => *retry,
            DeliveryState::Delivered { attempts } | DeliveryState::Exhausted { attempts } => *attempts,
        }
    }
}

/// How a delivery ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Exhausted,
    /// Shutdown was requested while waiting to retry
    Abandoned,
}

/// Summary of a finished delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub outcome: DeliveryOutcome,
    pub attempts: u32,
    pub last_error: Option<DeliveryError>,
}

/// Perform a single bounded call.
///
/// Any response within the timeout counts as delivered, whatever its status; only a transport
/// failure or a timeout is retried.
pub(crate) async fn attempt(client: &dyn HttpClient, url: &str, body: &serde_json::Value, timeout: Duration) -> Result<u16, DeliveryError> {
    let response = tokio::time::timeout(timeout, client.post_json(url, body, timeout))
        .await
        .map_err(|_| DeliveryError::Timeout(timeout))??;

    if !response.is_success() {
        tracing::warn!(url, status = response.status, "Webhook endpoint answered with an error status");
    }
    Ok(response.status)
}

/// Deliver `body` to `url`, retrying per `policy` until success, exhaustion or shutdown.
pub async fn deliver(
    client: &dyn HttpClient,
    url: &str,
    body: &serde_json::Value,
    policy: &RetryPolicy,
    shutdown: &CancellationToken,
) -> DeliveryReport {
    let mut state = DeliveryState::Initial;
    let mut last_error = None;

    loop {
        match state {
            DeliveryState::Delivered { attempts } => {
                return DeliveryReport {
                    outcome: DeliveryOutcome::Delivered,
                    attempts,
                    last_error: None,
                };
            }
            DeliveryState::Exhausted { attempts } => {
                return DeliveryReport {
                    outcome: DeliveryOutcome::Exhausted,
                    attempts,
                    last_error,
                };
            }
            DeliveryState::Retrying { retry } => {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        tracing::debug!(url, retry, "Shutdown requested while waiting to retry");
                        return DeliveryReport {
                            outcome: DeliveryOutcome::Abandoned,
                            attempts: state.calls_made(),
                            last_error,
                        };
                    }
                    _ = tokio::time::sleep(policy.retry_delay) => {}
                }
            }
            DeliveryState::Initial => {}
        }

        let call = state.calls_made() + 1;
        let result = attempt(client, url, body, policy.request_timeout).await;

        match &result {
            Ok(status) => {
                counter!("notifctl_notification_attempts_total", "outcome" => "success").increment(1);
                tracing::debug!(url, attempt = call, status, "Notification delivered");
            }
            Err(e) => {
                counter!("notifctl_notification_attempts_total", "outcome" => "failure").increment(1);
                tracing::warn!(url, attempt = call, error = %e, "Notification delivery attempt failed");
            }
        }

        state = state.advance(result.is_ok(), policy.retry_attempts);
        if let Err(e) = result {
            last_error = Some(e);
        }
    }
}
