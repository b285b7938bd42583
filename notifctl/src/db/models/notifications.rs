//! Database models for the notification execution ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::types::{MerchantId, NotificationId, TransactionId, UrlId};

/// Lifecycle status of a notification execution.
///
/// Rows are created as `Pending` and move exactly once to `Success` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Pending,
    Success,
    Failed,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NotificationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Unknown notification status: {}", s)),
        }
    }
}

/// Database model for a notification execution.
#[derive(Debug, Clone, FromRow)]
pub struct NotificationExecution {
    pub notification_id: NotificationId,
    pub merchant_id: MerchantId,
    pub url_id: UrlId,
    pub notification_type: String,
    pub transaction_id: TransactionId,
    pub amount: f64,
    pub transaction_status: String,
    pub idempotency_key: String,
    pub check_sum: String,
    pub notification_status: String,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NotificationExecution {
    /// Get the parsed notification status.
    pub fn status(&self) -> NotificationStatus {
        self.notification_status.parse().unwrap_or(NotificationStatus::Pending)
    }
}

/// Request to record a newly admitted dispatch. Always inserted as `pending`.
#[derive(Debug, Clone)]
pub struct NotificationExecutionCreateDBRequest {
    pub merchant_id: MerchantId,
    pub url_id: UrlId,
    pub notification_type: String,
    pub transaction_id: TransactionId,
    pub amount: f64,
    pub transaction_status: String,
    pub idempotency_key: String,
    pub check_sum: String,
}

/// Terminal status update written by the delivery task that owns the execution.
#[derive(Debug, Clone)]
pub struct NotificationStatusUpdate {
    pub merchant_id: MerchantId,
    pub idempotency_key: String,
    pub transaction_id: TransactionId,
    pub status: NotificationStatus,
    pub attempts: i32,
    pub last_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_and_display() {
        for status in [NotificationStatus::Pending, NotificationStatus::Success, NotificationStatus::Failed] {
            assert_eq!(status.as_str().parse::<NotificationStatus>().unwrap(), status);
            assert_eq!(status.to_string(), status.as_str());
        }
        assert!("delivered".parse::<NotificationStatus>().is_err());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!NotificationStatus::Pending.is_terminal());
        assert!(NotificationStatus::Success.is_terminal());
        assert!(NotificationStatus::Failed.is_terminal());
    }
}
