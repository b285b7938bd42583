//! Wire payloads POSTed to merchant webhook URLs.

use serde::{Deserialize, Serialize};

use crate::db::models::notifications::NotificationExecution;
use crate::types::TransactionId;

/// Body of a transaction notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub notification_type: String,
    pub transaction_id: TransactionId,
    pub amount: f64,
    pub transaction_status: String,
    pub check_sum: String,
    pub idempotency_key: String,
}

impl From<&NotificationExecution> for NotificationPayload {
    fn from(execution: &NotificationExecution) -> Self {
        Self {
            notification_type: execution.notification_type.clone(),
            transaction_id: execution.transaction_id,
            amount: execution.amount,
            transaction_status: execution.transaction_status.clone(),
            check_sum: execution.check_sum.clone(),
            idempotency_key: execution.idempotency_key.clone(),
        }
    }
}

/// Body of a test notification. Unsigned, with fixed sample values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestNotificationPayload {
    pub notification_type: String,
    pub transaction_id: TransactionId,
    /// Whole sample amount, serialized as a JSON integer
    pub amount: i64,
    pub transaction_status: String,
}

impl TestNotificationPayload {
    pub const SAMPLE_TRANSACTION_ID: TransactionId = 123;
    pub const SAMPLE_AMOUNT: i64 = 100000;
    pub const SAMPLE_STATUS: &'static str = "success";

    pub fn sample(notification_type: &str) -> Self {
        Self {
            notification_type: notification_type.to_string(),
            transaction_id: Self::SAMPLE_TRANSACTION_ID,
            amount: Self::SAMPLE_AMOUNT,
            transaction_status: Self::SAMPLE_STATUS.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_notification_payload_fields() {
        let payload = NotificationPayload {
            notification_type: "refund".to_string(),
            transaction_id: 2323,
            amount: 10000.0,
            transaction_status: "success".to_string(),
            check_sum: "389a6aeb747c5875c9d617d16c394a3e".to_string(),
            idempotency_key: "abc".to_string(),
        };

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            json!({
                "notification_type": "refund",
                "transaction_id": 2323,
                "amount": 10000.0,
                "transaction_status": "success",
                "check_sum": "389a6aeb747c5875c9d617d16c394a3e",
                "idempotency_key": "abc",
            })
        );
    }

    #[test]
    fn test_sample_payload_has_no_signature() {
        let value = serde_json::to_value(TestNotificationPayload::sample("refund")).unwrap();
        let object = value.as_object().unwrap();

        assert_eq!(object["transaction_id"], json!(123));
        assert_eq!(object["amount"], json!(100000));
        assert!(object["amount"].is_i64());
        assert_eq!(object["transaction_status"], json!("success"));
        assert!(!object.contains_key("check_sum"));
        assert!(!object.contains_key("idempotency_key"));
    }
}
