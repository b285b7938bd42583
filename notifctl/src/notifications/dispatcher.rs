//! Notification dispatch: validate, resolve, guard, sign, record, deliver.
//!
//! ```text
//! dispatcher.dispatch(request)
//!   ├─ validate fields                     // "<field> is required"
//!   ├─ registry::resolve()                 // URL + merchant signing key
//!   ├─ reject inactive URL / missing key
//!   ├─ guard::is_dispatchable()            // pending or success blocks
//!   ├─ keys::generate_idempotency_key()
//!   ├─ signing::sign()                     // MD5 check_sum
//!   ├─ DB: insert_execution(pending)
//!   └─ tracker.spawn(delivery task) ───────────────────────────┐
//!                                                              ▼
//!                                  delivery::deliver()  (initial + N retries)
//!                                  DB: update_execution_status(success | failed)
//! ```
//!
//! The request path returns as soon as the delivery task is scheduled. Delivery tasks are
//! tracked so that shutdown can wait for them; a task waiting to retry when shutdown starts
//! records its execution as failed instead of leaving it pending.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, info, instrument};

use crate::db::errors::DbError;
use crate::db::models::notifications::{
    NotificationExecution, NotificationExecutionCreateDBRequest, NotificationStatus, NotificationStatusUpdate,
};
use crate::db::storage::Storage;
use crate::errors::{Error, Result};
use crate::notifications::delivery::{self, DeliveryOutcome, DeliveryReport, RetryPolicy};
use crate::notifications::events::{NotificationPayload, TestNotificationPayload};
use crate::notifications::http::HttpClient;
use crate::notifications::{guard, keys, registry, signing};
use crate::types::{MerchantId, TransactionId, UrlId};

pub const ABANDONED_ON_SHUTDOWN: &str = "delivery abandoned on shutdown";

/// A request to notify a merchant about a transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRequest {
    pub merchant_id: MerchantId,
    pub transaction_id: TransactionId,
    pub notification_type: String,
    pub amount: f64,
    pub transaction_status: String,
}

impl DispatchRequest {
    /// Check required fields, reporting the first one missing.
    pub fn validate(&self) -> Result<()> {
        if self.transaction_id <= 0 {
            return Err(Error::required("transaction_id"));
        }
        if self.merchant_id <= 0 {
            return Err(Error::required("merchant_id"));
        }
        if self.notification_type.is_empty() {
            return Err(Error::required("notification_type"));
        }
        if self.transaction_status.is_empty() {
            return Err(Error::required("transaction_status"));
        }
        Ok(())
    }
}

/// Admits notifications and owns their delivery tasks.
#[derive(Clone)]
pub struct NotificationDispatcher {
    storage: Arc<dyn Storage>,
    http_client: Arc<dyn HttpClient>,
    policy: RetryPolicy,
    tracker: TaskTracker,
    shutdown: CancellationToken,
}

impl NotificationDispatcher {
    pub fn new(storage: Arc<dyn Storage>, http_client: Arc<dyn HttpClient>, policy: RetryPolicy) -> Self {
        Self {
            storage,
            http_client,
            policy,
            tracker: TaskTracker::new(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    /// Admit a notification and schedule its delivery.
    ///
    /// Returns the pending execution; the outcome of delivery is only visible in the ledger.
    #[instrument(
        skip(self, request),
        fields(merchant_id = request.merchant_id, transaction_id = request.transaction_id, notification_type = %request.notification_type),
        err
    )]
    pub async fn dispatch(&self, request: &DispatchRequest) -> Result<NotificationExecution> {
        request.validate()?;

        let webhook = registry::resolve(self.storage(), request.merchant_id, &request.notification_type).await?;
        if !webhook.is_active {
            return Err(Error::BadRequest {
                message: "URL status is inactive".to_string(),
            });
        }
        let Some(merchant_key) = webhook.merchant_key.as_deref() else {
            tracing::warn!(url_id = webhook.url_id, "Merchant has a webhook but no signing key");
            return Err(Error::NotConfigured {
                merchant_id: request.merchant_id,
                notification_type: request.notification_type.clone(),
            });
        };

        if !guard::is_dispatchable(self.storage(), request.merchant_id, request.transaction_id).await? {
            return Err(already_dispatched(request.transaction_id));
        }

        let idempotency_key = keys::generate_idempotency_key();
        let check_sum = signing::sign(
            &request.notification_type,
            request.transaction_id,
            request.amount,
            &request.transaction_status,
            merchant_key,
        );

        let execution = self
            .storage
            .insert_execution(&NotificationExecutionCreateDBRequest {
                merchant_id: request.merchant_id,
                url_id: webhook.url_id,
                notification_type: request.notification_type.clone(),
                transaction_id: request.transaction_id,
                amount: request.amount,
                transaction_status: request.transaction_status.clone(),
                idempotency_key,
                check_sum,
            })
            .await
            .map_err(|e| match e {
                // Lost a race with a concurrent dispatch for the same transaction
                DbError::UniqueViolation { .. } => already_dispatched(request.transaction_id),
                other => other.into(),
            })?;

        counter!("notifctl_notifications_dispatched_total").increment(1);
        info!(
            notification_id = execution.notification_id,
            idempotency_key = %execution.idempotency_key,
            "Notification admitted, scheduling delivery"
        );

        self.spawn_delivery(execution.clone(), webhook.url);
        Ok(execution)
    }

    fn spawn_delivery(&self, execution: NotificationExecution, url: String) {
        let storage = self.storage.clone();
        let http_client = self.http_client.clone();
        let policy = self.policy;
        let shutdown = self.shutdown.clone();

        let span = tracing::info_span!(
            "notification_delivery",
            notification_id = execution.notification_id,
            merchant_id = execution.merchant_id,
            transaction_id = execution.transaction_id,
        );

        self.tracker.spawn(
            async move {
                let report = match serde_json::to_value(NotificationPayload::from(&execution)) {
                    Ok(body) => delivery::deliver(http_client.as_ref(), &url, &body, &policy, &shutdown).await,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to serialize notification payload");
                        DeliveryReport {
                            outcome: DeliveryOutcome::Exhausted,
                            attempts: 0,
                            last_error: None,
                        }
                    }
                };
                record_outcome(storage.as_ref(), &execution, &report).await;
            }
            .instrument(span),
        );
    }

    /// Send a single unsigned sample notification to an inactive registration.
    ///
    /// Nothing is written to the ledger and the call is not retried; its result is only logged.
    #[instrument(skip(self), err)]
    pub async fn send_test(&self, url_id: UrlId) -> Result<()> {
        let webhook = registry::get_by_id(self.storage(), url_id).await?;
        if webhook.is_active {
            return Err(Error::BadRequest {
                message: "URL status is active".to_string(),
            });
        }

        let body = serde_json::to_value(TestNotificationPayload::sample(&webhook.notification_type))
            .map_err(|e| Error::Other(e.into()))?;
        let http_client = self.http_client.clone();
        let timeout = self.policy.request_timeout;

        self.tracker.spawn(
            async move {
                match delivery::attempt(http_client.as_ref(), &webhook.url, &body, timeout).await {
                    Ok(status) => info!(status, "Test notification delivered"),
                    Err(e) => tracing::warn!(error = %e, "Test notification failed"),
                }
            }
            .instrument(tracing::info_span!("test_notification", url_id)),
        );

        Ok(())
    }

    /// List ledger entries for a merchant, optionally for one transaction.
    #[instrument(skip(self), err)]
    pub async fn list_executions(
        &self,
        merchant_id: MerchantId,
        transaction_id: Option<TransactionId>,
    ) -> Result<Vec<NotificationExecution>> {
        if merchant_id <= 0 {
            return Err(Error::required("merchant_id"));
        }
        Ok(self.storage.list_executions(merchant_id, transaction_id).await?)
    }

    /// Number of delivery and test tasks still running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Wait until every task spawned so far has finished.
    pub async fn wait_for_deliveries(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Stop scheduling retries and wait up to `grace` for running tasks to finish.
    pub async fn shutdown(&self, grace: Duration) {
        info!(in_flight = self.tracker.len(), "Stopping notification deliveries...");
        self.shutdown.cancel();
        self.tracker.close();

        if tokio::time::timeout(grace, self.tracker.wait()).await.is_err() {
            tracing::warn!(
                remaining = self.tracker.len(),
                "Notification deliveries did not finish within the shutdown grace period"
            );
        }
    }
}

fn already_dispatched(transaction_id: TransactionId) -> Error {
    Error::Conflict {
        message: format!("Notification for transaction {transaction_id} is already in progress or delivered"),
    }
}

/// Write the terminal status of a delivery to the ledger.
///
/// Storage failures here are logged and swallowed; they never affect the delivery itself.
async fn record_outcome(storage: &dyn Storage, execution: &NotificationExecution, report: &DeliveryReport) {
    let (status, last_error) = match report.outcome {
        DeliveryOutcome::Delivered => (NotificationStatus::Success, None),
        DeliveryOutcome::Exhausted => (
            NotificationStatus::Failed,
            Some(
                report
                    .last_error
                    .as_ref()
                    .map_or_else(|| "payload could not be serialized".to_string(), |e| e.to_string()),
            ),
        ),
        DeliveryOutcome::Abandoned => (NotificationStatus::Failed, Some(ABANDONED_ON_SHUTDOWN.to_string())),
    };

    counter!("notifctl_notifications_total", "status" => status.as_str()).increment(1);

    let update = NotificationStatusUpdate {
        merchant_id: execution.merchant_id,
        idempotency_key: execution.idempotency_key.clone(),
        transaction_id: execution.transaction_id,
        status,
        attempts: report.attempts as i32,
        last_error,
    };

    match storage.update_execution_status(&update).await {
        Ok(Some(_)) => info!(status = %status, attempts = report.attempts, "Notification finished"),
        Ok(None) => tracing::warn!(status = %status, "No pending execution matched the terminal update"),
        Err(e) => tracing::error!(error = %e, status = %status, "Failed to record notification status"),
    }
}
