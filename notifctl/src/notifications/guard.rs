//! Admission check for new dispatches.
//!
//! A (merchant, transaction) pair may be dispatched only when the ledger holds no execution
//! for it that is still `pending` (a delivery is in flight) or already `success` (the merchant
//! has been notified). `failed` executions never block, so a transaction whose delivery was
//! exhausted can be dispatched again.

use tracing::{debug, instrument};

use crate::db::errors::Result;
use crate::db::models::notifications::NotificationStatus;
use crate::db::storage::Storage;
use crate::types::{MerchantId, TransactionId};

/// Statuses that block a new dispatch for the same (merchant, transaction).
pub const BLOCKING_STATUSES: [NotificationStatus; 2] = [NotificationStatus::Pending, NotificationStatus::Success];

/// Returns `true` when a new dispatch for the pair may proceed.
#[instrument(skip(storage), err)]
pub async fn is_dispatchable(storage: &dyn Storage, merchant_id: MerchantId, transaction_id: TransactionId) -> Result<bool> {
    let blocking = storage
        .count_executions(merchant_id, transaction_id, &BLOCKING_STATUSES)
        .await?;

    debug!(blocking, "Checked for in-flight or delivered executions");
    Ok(blocking == 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::notifications::{NotificationExecutionCreateDBRequest, NotificationStatusUpdate};
    use crate::db::models::webhooks::{WebhookUrl, WebhookUrlCreateDBRequest};
    use crate::db::storage::InMemoryStorage;

    async fn setup() -> (InMemoryStorage, WebhookUrl) {
        let storage = InMemoryStorage::new();
        let webhook = storage
            .insert_webhook_url(&WebhookUrlCreateDBRequest {
                merchant_id: 1,
                url: "https://m.example/hook".to_string(),
                notification_type: "refund".to_string(),
            })
            .await
            .unwrap();
        (storage, webhook)
    }

    async fn admit(storage: &InMemoryStorage, webhook: &WebhookUrl, key: &str) {
        storage
            .insert_execution(&NotificationExecutionCreateDBRequest {
                merchant_id: webhook.merchant_id,
                url_id: webhook.url_id,
                notification_type: webhook.notification_type.clone(),
                transaction_id: 2323,
                amount: 10.0,
                transaction_status: "success".to_string(),
                idempotency_key: key.to_string(),
                check_sum: "digest".to_string(),
            })
            .await
            .unwrap();
    }

    async fn finish(storage: &InMemoryStorage, key: &str, status: NotificationStatus) {
        storage
            .update_execution_status(&NotificationStatusUpdate {
                merchant_id: 1,
                idempotency_key: key.to_string(),
                transaction_id: 2323,
                status,
                attempts: 1,
                last_error: None,
            })
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_no_history_is_dispatchable() {
        let (storage, _) = setup().await;
        assert!(is_dispatchable(&storage, 1, 2323).await.unwrap());
    }

    #[tokio::test]
    async fn test_pending_blocks() {
        let (storage, webhook) = setup().await;
        admit(&storage, &webhook, "a").await;

        assert!(!is_dispatchable(&storage, 1, 2323).await.unwrap());
        // Other transactions and merchants are unaffected
        assert!(is_dispatchable(&storage, 1, 2324).await.unwrap());
        assert!(is_dispatchable(&storage, 2, 2323).await.unwrap());
    }

    #[tokio::test]
    async fn test_success_blocks() {
        let (storage, webhook) = setup().await;
        admit(&storage, &webhook, "a").await;
        finish(&storage, "a", NotificationStatus::Success).await;

        assert!(!is_dispatchable(&storage, 1, 2323).await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_does_not_block() {
        let (storage, webhook) = setup().await;
        admit(&storage, &webhook, "a").await;
        finish(&storage, "a", NotificationStatus::Failed).await;

        assert!(is_dispatchable(&storage, 1, 2323).await.unwrap());
    }
}
