//! Storage backends for merchants, webhook registrations and the execution ledger.
//!
//! The [`Storage`] trait is the single persistence seam of the service. Everything above it
//! (key issuance, the registry, the dispatch guard and the delivery engine) receives an
//! `Arc<dyn Storage>` at construction time, so the same code runs against PostgreSQL in
//! production and against [`InMemoryStorage`] in development and tests.
//!
//! Both backends enforce the same uniqueness rules and report violations as
//! [`DbError::UniqueViolation`](crate::db::errors::DbError::UniqueViolation) with the
//! constraint names from the migration:
//!
//! - `webhook_urls_merchant_type_unique`: one URL per (merchant, notification type)
//! - `webhook_urls_merchant_url_unique`: one registration per (merchant, URL)
//! - `notification_executions_idempotency_key_unique`: idempotency keys never repeat
//! - `notification_executions_one_pending`: at most one pending execution per (merchant, transaction)

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::DatabaseConfig;
use crate::db::errors::Result;
use crate::db::models::merchants::Merchant;
use crate::db::models::notifications::{
    NotificationExecution, NotificationExecutionCreateDBRequest, NotificationStatus, NotificationStatusUpdate,
};
use crate::db::models::webhooks::{ResolvedWebhook, WebhookUrl, WebhookUrlCreateDBRequest};
use crate::types::{MerchantId, TransactionId, UrlId};

pub mod in_memory;
pub mod postgres;


pub use in_memory::InMemoryStorage;
pub use postgres::PostgresStorage;

/// Constraint names shared by both storage backends.
pub mod constraints {
    pub const MERCHANT_TYPE_UNIQUE: &str = "webhook_urls_merchant_type_unique";
    pub const MERCHANT_URL_UNIQUE: &str = "webhook_urls_merchant_url_unique";
    pub const IDEMPOTENCY_KEY_UNIQUE: &str = "notification_executions_idempotency_key_unique";
    pub const ONE_PENDING: &str = "notification_executions_one_pending";
    pub const EXECUTION_URL_FKEY: &str = "notification_executions_url_id_fkey";
}

/// Persistence operations used by the notification engine.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Store `signing_key` as the merchant's current key, creating the merchant if needed.
    async fn upsert_signing_key(&self, merchant_id: MerchantId, signing_key: &str) -> Result<Merchant>;

    /// Get a merchant by ID.
    ///
    /// Inspection helper: dispatch reads the key through [`Storage::resolve_webhook`], so only
    /// tests and operators reading back an issued key call this.
    async fn get_merchant(&self, merchant_id: MerchantId) -> Result<Option<Merchant>>;

    /// Count registrations of the merchant whose URL or notification type matches.
    async fn count_conflicting_urls(&self, merchant_id: MerchantId, url: &str, notification_type: &str) -> Result<i64>;

    /// Insert a new (inactive) webhook registration.
    async fn insert_webhook_url(&self, request: &WebhookUrlCreateDBRequest) -> Result<WebhookUrl>;

    /// Get a registration by ID.
    async fn get_webhook_url(&self, url_id: UrlId) -> Result<Option<WebhookUrl>>;

    /// Look up the registration for (merchant, notification type) joined with the merchant's
    /// current signing key.
    async fn resolve_webhook(&self, merchant_id: MerchantId, notification_type: &str) -> Result<Option<ResolvedWebhook>>;

    /// Flip `is_active` on a registration. Returns `None` if it does not exist.
    async fn toggle_webhook_url(&self, url_id: UrlId) -> Result<Option<WebhookUrl>>;

    /// Record a newly admitted dispatch as `pending`.
    async fn insert_execution(&self, request: &NotificationExecutionCreateDBRequest) -> Result<NotificationExecution>;

    /// Move a pending execution, identified by (merchant, idempotency key, transaction), to its
    /// terminal status. Returns `None` if no pending row matched.
    async fn update_execution_status(&self, update: &NotificationStatusUpdate) -> Result<Option<NotificationExecution>>;

    /// Count executions for (merchant, transaction) whose status is one of `statuses`.
    async fn count_executions(
        &self,
        merchant_id: MerchantId,
        transaction_id: TransactionId,
        statuses: &[NotificationStatus],
    ) -> Result<i64>;

    /// List executions for a merchant, newest first, optionally narrowed to one transaction.
    async fn list_executions(
        &self,
        merchant_id: MerchantId,
        transaction_id: Option<TransactionId>,
    ) -> Result<Vec<NotificationExecution>>;

    /// Release any held resources (connection pools). Called once during shutdown.
    async fn close(&self) {}
}

/// Create a storage backend based on configuration.
///
/// External databases are connected and migrated before being returned.
pub async fn create_storage(config: &DatabaseConfig) -> anyhow::Result<Arc<dyn Storage>> {
    match config {
        DatabaseConfig::InMemory => {
            tracing::info!("Using in-memory storage; all data will be lost on shutdown");
            Ok(Arc::new(InMemoryStorage::new()))
        }
        DatabaseConfig::External { url, pool } => {
            tracing::info!("Using external database");
            let storage = PostgresStorage::connect(url, pool).await?;
            storage.migrate().await?;
            Ok(Arc::new(storage))
        }
    }
}
