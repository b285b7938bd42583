//! Database models for webhook URL registrations.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::types::{MerchantId, UrlId};

/// Database model for a webhook URL registration.
#[derive(Debug, Clone, FromRow)]
pub struct WebhookUrl {
    pub url_id: UrlId,
    pub merchant_id: MerchantId,
    pub url: String,
    pub notification_type: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A registration joined with its merchant's current signing key.
///
/// `merchant_key` is `None` when the merchant never had a key issued.
#[derive(Debug, Clone, FromRow)]
pub struct ResolvedWebhook {
    pub url_id: UrlId,
    pub merchant_id: MerchantId,
    pub url: String,
    pub notification_type: String,
    pub is_active: bool,
    pub merchant_key: Option<String>,
}

/// Request to register a new webhook URL.
#[derive(Debug, Clone)]
pub struct WebhookUrlCreateDBRequest {
    pub merchant_id: MerchantId,
    pub url: String,
    pub notification_type: String,
}
