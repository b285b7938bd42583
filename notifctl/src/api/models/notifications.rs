//! API request and response models for notification dispatch and the execution ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::db::models::notifications::{NotificationExecution, NotificationStatus};
use crate::notifications::DispatchRequest;
use crate::types::{MerchantId, NotificationId, TransactionId, UrlId};

/// Request to notify a merchant about a transaction.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct NotificationExecute {
    pub merchant_id: MerchantId,
    pub transaction_id: TransactionId,
    pub notification_type: String,
    pub amount: f64,
    pub transaction_status: String,
}

impl From<NotificationExecute> for DispatchRequest {
    fn from(execute: NotificationExecute) -> Self {
        Self {
            merchant_id: execute.merchant_id,
            transaction_id: execute.transaction_id,
            notification_type: execute.notification_type,
            amount: execute.amount,
            transaction_status: execute.transaction_status,
        }
    }
}

/// Query parameters for listing executions.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListExecutionsQuery {
    /// Merchant whose executions to list
    #[serde(default)]
    pub merchant_id: MerchantId,
    /// Restrict to a single transaction
    pub transaction_id: Option<TransactionId>,
}

/// A notification execution ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NotificationExecutionResponse {
    pub notification_id: NotificationId,
    pub merchant_id: MerchantId,
    pub url_id: UrlId,
    pub notification_type: String,
    pub transaction_id: TransactionId,
    pub amount: f64,
    pub transaction_status: String,
    /// Token merchants use to de-duplicate deliveries
    pub idempotency_key: String,
    /// MD5 digest over the notification fields and the merchant signing key
    pub check_sum: String,
    #[schema(value_type = String)]
    pub notification_status: NotificationStatus,
    /// Delivery calls made so far (0 while the first attempt is in flight)
    pub attempts: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<NotificationExecution> for NotificationExecutionResponse {
    fn from(db: NotificationExecution) -> Self {
        Self {
            notification_status: db.status(),
            notification_id: db.notification_id,
            merchant_id: db.merchant_id,
            url_id: db.url_id,
            notification_type: db.notification_type,
            transaction_id: db.transaction_id,
            amount: db.amount,
            transaction_status: db.transaction_status,
            idempotency_key: db.idempotency_key,
            check_sum: db.check_sum,
            attempts: db.attempts,
            last_error: db.last_error,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}
