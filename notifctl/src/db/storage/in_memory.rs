//! In-memory storage backend.
//!
//! Keeps every table in a single lock-protected state so that check-then-insert sequences are
//! atomic, mirroring the unique constraints of the PostgreSQL schema. Suitable for development
//! and tests; all data is lost on restart.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use super::{Storage, constraints};
use crate::db::errors::{DbError, Result};
use crate::db::models::merchants::Merchant;
use crate::db::models::notifications::{
    NotificationExecution, NotificationExecutionCreateDBRequest, NotificationStatus, NotificationStatusUpdate,
};
use crate::db::models::webhooks::{ResolvedWebhook, WebhookUrl, WebhookUrlCreateDBRequest};
use crate::types::{MerchantId, NotificationId, TransactionId, UrlId};

#[derive(Default)]
struct State {
    merchants: HashMap<MerchantId, Merchant>,
    webhook_urls: BTreeMap<UrlId, WebhookUrl>,
    executions: BTreeMap<NotificationId, NotificationExecution>,
    last_url_id: UrlId,
    last_notification_id: NotificationId,
}

/// In-memory implementation of the [`Storage`] trait.
///
/// # Example
/// ```ignore
/// let storage = InMemoryStorage::new();
/// storage.upsert_signing_key(42, "key").await?;
/// ```
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    state: Arc<RwLock<State>>,
}

impl InMemoryStorage {
    /// Create a new, empty in-memory storage.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn upsert_signing_key(&self, merchant_id: MerchantId, signing_key: &str) -> Result<Merchant> {
        let now = Utc::now();
        let mut state = self.state.write();

        let merchant = state
            .merchants
            .entry(merchant_id)
            .and_modify(|m| {
                m.signing_key = Some(signing_key.to_string());
                m.updated_at = now;
            })
            .or_insert_with(|| Merchant {
                merchant_id,
                signing_key: Some(signing_key.to_string()),
                created_at: now,
                updated_at: now,
            });

        Ok(merchant.clone())
    }

    async fn get_merchant(&self, merchant_id: MerchantId) -> Result<Option<Merchant>> {
        Ok(self.state.read().merchants.get(&merchant_id).cloned())
    }

    async fn count_conflicting_urls(&self, merchant_id: MerchantId, url: &str, notification_type: &str) -> Result<i64> {
        let state = self.state.read();
        let count = state
            .webhook_urls
            .values()
            .filter(|w| w.merchant_id == merchant_id && (w.url == url || w.notification_type == notification_type))
            .count();

        Ok(count as i64)
    }

    async fn insert_webhook_url(&self, request: &WebhookUrlCreateDBRequest) -> Result<WebhookUrl> {
        let mut state = self.state.write();

        for existing in state.webhook_urls.values().filter(|w| w.merchant_id == request.merchant_id) {
            if existing.notification_type == request.notification_type {
                return Err(DbError::unique_violation(
                    "webhook_urls",
                    constraints::MERCHANT_TYPE_UNIQUE,
                    format!("{}, {}", request.merchant_id, request.notification_type),
                ));
            }
            if existing.url == request.url {
                return Err(DbError::unique_violation(
                    "webhook_urls",
                    constraints::MERCHANT_URL_UNIQUE,
                    format!("{}, {}", request.merchant_id, request.url),
                ));
            }
        }

        state.last_url_id += 1;
        let now = Utc::now();
        let webhook = WebhookUrl {
            url_id: state.last_url_id,
            merchant_id: request.merchant_id,
            url: request.url.clone(),
            notification_type: request.notification_type.clone(),
            is_active: false,
            created_at: now,
            updated_at: now,
        };
        state.webhook_urls.insert(webhook.url_id, webhook.clone());

        Ok(webhook)
    }

    async fn get_webhook_url(&self, url_id: UrlId) -> Result<Option<WebhookUrl>> {
        Ok(self.state.read().webhook_urls.get(&url_id).cloned())
    }

    async fn resolve_webhook(&self, merchant_id: MerchantId, notification_type: &str) -> Result<Option<ResolvedWebhook>> {
        let state = self.state.read();
        let resolved = state
            .webhook_urls
            .values()
            .find(|w| w.merchant_id == merchant_id && w.notification_type == notification_type)
            .map(|w| ResolvedWebhook {
                url_id: w.url_id,
                merchant_id: w.merchant_id,
                url: w.url.clone(),
                notification_type: w.notification_type.clone(),
                is_active: w.is_active,
                merchant_key: state.merchants.get(&merchant_id).and_then(|m| m.signing_key.clone()),
            });

        Ok(resolved)
    }

    async fn toggle_webhook_url(&self, url_id: UrlId) -> Result<Option<WebhookUrl>> {
        let mut state = self.state.write();
        let Some(webhook) = state.webhook_urls.get_mut(&url_id) else {
            return Ok(None);
        };

        webhook.is_active = !webhook.is_active;
        webhook.updated_at = Utc::now();

        Ok(Some(webhook.clone()))
    }

    async fn insert_execution(&self, request: &NotificationExecutionCreateDBRequest) -> Result<NotificationExecution> {
        let mut state = self.state.write();

        if !state.webhook_urls.contains_key(&request.url_id) {
            return Err(DbError::ForeignKeyViolation {
                constraint: Some(constraints::EXECUTION_URL_FKEY.to_string()),
                table: Some("notification_executions".to_string()),
                message: format!("url_id {} does not reference a webhook registration", request.url_id),
            });
        }

        for existing in state.executions.values() {
            if existing.idempotency_key == request.idempotency_key {
                return Err(DbError::unique_violation(
                    "notification_executions",
                    constraints::IDEMPOTENCY_KEY_UNIQUE,
                    request.idempotency_key.clone(),
                ));
            }
            if existing.merchant_id == request.merchant_id
                && existing.transaction_id == request.transaction_id
                && existing.status() == NotificationStatus::Pending
            {
                return Err(DbError::unique_violation(
                    "notification_executions",
                    constraints::ONE_PENDING,
                    format!("{}, {}", request.merchant_id, request.transaction_id),
                ));
            }
        }

        state.last_notification_id += 1;
        let now = Utc::now();
        let execution = NotificationExecution {
            notification_id: state.last_notification_id,
            merchant_id: request.merchant_id,
            url_id: request.url_id,
            notification_type: request.notification_type.clone(),
            transaction_id: request.transaction_id,
            amount: request.amount,
            transaction_status: request.transaction_status.clone(),
            idempotency_key: request.idempotency_key.clone(),
            check_sum: request.check_sum.clone(),
            notification_status: NotificationStatus::Pending.as_str().to_string(),
            attempts: 0,
            last_error: None,
            created_at: now,
            updated_at: now,
        };
        state.executions.insert(execution.notification_id, execution.clone());

        Ok(execution)
    }

    async fn update_execution_status(&self, update: &NotificationStatusUpdate) -> Result<Option<NotificationExecution>> {
        let mut state = self.state.write();
        let Some(execution) = state.executions.values_mut().find(|e| {
            e.merchant_id == update.merchant_id
                && e.idempotency_key == update.idempotency_key
                && e.transaction_id == update.transaction_id
                && e.status() == NotificationStatus::Pending
        }) else {
            return Ok(None);
        };

        execution.notification_status = update.status.as_str().to_string();
        execution.attempts = update.attempts;
        execution.last_error = update.last_error.clone();
        execution.updated_at = Utc::now();

        Ok(Some(execution.clone()))
    }

    async fn count_executions(
        &self,
        merchant_id: MerchantId,
        transaction_id: TransactionId,
        statuses: &[NotificationStatus],
    ) -> Result<i64> {
        let state = self.state.read();
        let count = state
            .executions
            .values()
            .filter(|e| e.merchant_id == merchant_id && e.transaction_id == transaction_id && statuses.contains(&e.status()))
            .count();

        Ok(count as i64)
    }

    async fn list_executions(
        &self,
        merchant_id: MerchantId,
        transaction_id: Option<TransactionId>,
    ) -> Result<Vec<NotificationExecution>> {
        let state = self.state.read();
        // Ids are assigned in insertion order, so reverse id order is newest first
        let executions = state
            .executions
            .values()
            .rev()
            .filter(|e| e.merchant_id == merchant_id && transaction_id.is_none_or(|txn| e.transaction_id == txn))
            .cloned()
            .collect();

        Ok(executions)
    }
}
