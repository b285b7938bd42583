//! Webhook URL registry: one target URL per merchant and notification type.

use tracing::{info, instrument};

use crate::db::errors::DbError;
use crate::db::models::webhooks::{ResolvedWebhook, WebhookUrl, WebhookUrlCreateDBRequest};
use crate::db::storage::Storage;
use crate::errors::{Error, Result};
use crate::types::{MerchantId, UrlId};

const DUPLICATE_MESSAGE: &str = "Url or the notification_type already exists";

/// Register a webhook URL for a merchant and notification type.
///
/// A merchant may not register the same URL twice, nor two URLs for the same notification
/// type. New registrations start inactive.
#[instrument(skip(storage, request), fields(merchant_id = request.merchant_id, notification_type = %request.notification_type), err)]
pub async fn register(storage: &dyn Storage, request: WebhookUrlCreateDBRequest) -> Result<WebhookUrl> {
    if request.merchant_id <= 0 {
        return Err(Error::required("merchant_id"));
    }
    if request.url.is_empty() {
        return Err(Error::required("url"));
    }
    if request.notification_type.is_empty() {
        return Err(Error::required("notification_type"));
    }

    let conflicts = storage
        .count_conflicting_urls(request.merchant_id, &request.url, &request.notification_type)
        .await?;
    if conflicts > 0 {
        return Err(Error::Conflict {
            message: DUPLICATE_MESSAGE.to_string(),
        });
    }

    // The pre-check above can race with a concurrent registration; the unique constraints
    // catch whatever slips through.
    let webhook = storage.insert_webhook_url(&request).await.map_err(|e| match e {
        DbError::UniqueViolation { .. } => Error::Conflict {
            message: DUPLICATE_MESSAGE.to_string(),
        },
        other => other.into(),
    })?;

    info!(url_id = webhook.url_id, "Registered webhook URL");
    Ok(webhook)
}

/// Look up the registration (and signing key) that serves a merchant's notification type.
#[instrument(skip(storage), err)]
pub async fn resolve(storage: &dyn Storage, merchant_id: MerchantId, notification_type: &str) -> Result<ResolvedWebhook> {
    storage
        .resolve_webhook(merchant_id, notification_type)
        .await?
        .ok_or_else(|| Error::NotConfigured {
            merchant_id,
            notification_type: notification_type.to_string(),
        })
}

/// Get a registration by ID.
#[instrument(skip(storage), err)]
pub async fn get_by_id(storage: &dyn Storage, url_id: UrlId) -> Result<WebhookUrl> {
    if url_id <= 0 {
        return Err(Error::required("url_id"));
    }

    storage.get_webhook_url(url_id).await?.ok_or_else(|| not_found(url_id))
}

/// Flip a registration between active and inactive.
#[instrument(skip(storage), err)]
pub async fn toggle_active(storage: &dyn Storage, url_id: UrlId) -> Result<WebhookUrl> {
    if url_id <= 0 {
        return Err(Error::required("url_id"));
    }

    let webhook = storage.toggle_webhook_url(url_id).await?.ok_or_else(|| not_found(url_id))?;

    info!(url_id, is_active = webhook.is_active, "Toggled webhook URL status");
    Ok(webhook)
}

fn not_found(url_id: UrlId) -> Error {
    Error::NotFound {
        resource: "Webhook URL".to_string(),
        id: url_id.to_string(),
    }
}
