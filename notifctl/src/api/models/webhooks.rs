//! API request and response models for webhook URL endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::db::models::webhooks::{WebhookUrl, WebhookUrlCreateDBRequest};
use crate::types::{MerchantId, UrlId};

/// Request to register a webhook URL for a notification type.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct WebhookUrlCreate {
    pub merchant_id: MerchantId,
    /// Endpoint that will receive notifications
    pub url: String,
    /// Category of notification routed to this URL, e.g. `refund`
    pub notification_type: String,
}

impl From<WebhookUrlCreate> for WebhookUrlCreateDBRequest {
    fn from(create: WebhookUrlCreate) -> Self {
        Self {
            merchant_id: create.merchant_id,
            url: create.url,
            notification_type: create.notification_type,
        }
    }
}

/// Body identifying a registration, used by toggle and test.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct WebhookUrlRef {
    pub url_id: UrlId,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Path)]
pub struct WebhookUrlPathParams {
    pub url_id: UrlId,
}

/// A webhook URL registration.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WebhookUrlResponse {
    pub url_id: UrlId,
    pub merchant_id: MerchantId,
    pub url: String,
    pub notification_type: String,
    /// Only active registrations receive dispatched notifications
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<WebhookUrl> for WebhookUrlResponse {
    fn from(db: WebhookUrl) -> Self {
        Self {
            url_id: db.url_id,
            merchant_id: db.merchant_id,
            url: db.url,
            notification_type: db.notification_type,
            is_active: db.is_active,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// Acknowledgement that a test notification was scheduled.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WebhookTestResponse {
    pub url_id: UrlId,
    pub message: String,
}
