//! PostgreSQL storage backend.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::instrument;

use super::Storage;
use crate::config::PoolSettings;
use crate::db::errors::Result;
use crate::db::models::merchants::Merchant;
use crate::db::models::notifications::{
    NotificationExecution, NotificationExecutionCreateDBRequest, NotificationStatus, NotificationStatusUpdate,
};
use crate::db::models::webhooks::{ResolvedWebhook, WebhookUrl, WebhookUrlCreateDBRequest};
use crate::types::{MerchantId, TransactionId, UrlId, abbrev_key};

/// Storage backed by a PostgreSQL connection pool.
#[derive(Clone)]
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a new pool with the given settings.
    pub async fn connect(url: &str, settings: &PoolSettings) -> anyhow::Result<Self> {
        let mut options = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections)
            .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs));

        if settings.idle_timeout_secs > 0 {
            options = options.idle_timeout(Duration::from_secs(settings.idle_timeout_secs));
        }
        if settings.max_lifetime_secs > 0 {
            options = options.max_lifetime(Duration::from_secs(settings.max_lifetime_secs));
        }

        let pool = options.connect(url).await?;
        Ok(Self::new(pool))
    }

    /// Run pending schema migrations.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        crate::migrator().run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Storage for PostgresStorage {
    #[instrument(skip(self, signing_key), fields(key = %abbrev_key(signing_key)), err)]
    async fn upsert_signing_key(&self, merchant_id: MerchantId, signing_key: &str) -> Result<Merchant> {
        let merchant = sqlx::query_as::<_, Merchant>(
            r#"
            INSERT INTO merchants (merchant_id, signing_key)
            VALUES ($1, $2)
            ON CONFLICT (merchant_id) DO UPDATE
            SET signing_key = EXCLUDED.signing_key, updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(merchant_id)
        .bind(signing_key)
        .fetch_one(&self.pool)
        .await?;

        Ok(merchant)
    }

    #[instrument(skip(self), err)]
    async fn get_merchant(&self, merchant_id: MerchantId) -> Result<Option<Merchant>> {
        let merchant = sqlx::query_as::<_, Merchant>("SELECT * FROM merchants WHERE merchant_id = $1")
            .bind(merchant_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(merchant)
    }

    #[instrument(skip(self), err)]
    async fn count_conflicting_urls(&self, merchant_id: MerchantId, url: &str, notification_type: &str) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM webhook_urls
            WHERE merchant_id = $1 AND (url = $2 OR notification_type = $3)
            "#,
        )
        .bind(merchant_id)
        .bind(url)
        .bind(notification_type)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    #[instrument(skip(self, request), fields(merchant_id = request.merchant_id, notification_type = %request.notification_type), err)]
    async fn insert_webhook_url(&self, request: &WebhookUrlCreateDBRequest) -> Result<WebhookUrl> {
        let webhook = sqlx::query_as::<_, WebhookUrl>(
            r#"
            INSERT INTO webhook_urls (merchant_id, url, notification_type)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(request.merchant_id)
        .bind(&request.url)
        .bind(&request.notification_type)
        .fetch_one(&self.pool)
        .await?;

        Ok(webhook)
    }

    #[instrument(skip(self), err)]
    async fn get_webhook_url(&self, url_id: UrlId) -> Result<Option<WebhookUrl>> {
        let webhook = sqlx::query_as::<_, WebhookUrl>("SELECT * FROM webhook_urls WHERE url_id = $1")
            .bind(url_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(webhook)
    }

    #[instrument(skip(self), err)]
    async fn resolve_webhook(&self, merchant_id: MerchantId, notification_type: &str) -> Result<Option<ResolvedWebhook>> {
        let resolved = sqlx::query_as::<_, ResolvedWebhook>(
            r#"
            SELECT u.url_id, u.merchant_id, u.url, u.notification_type, u.is_active,
                   m.signing_key AS merchant_key
            FROM webhook_urls u
            LEFT JOIN merchants m ON m.merchant_id = u.merchant_id
            WHERE u.merchant_id = $1 AND u.notification_type = $2
            "#,
        )
        .bind(merchant_id)
        .bind(notification_type)
        .fetch_optional(&self.pool)
        .await?;

        Ok(resolved)
    }

    #[instrument(skip(self), err)]
    async fn toggle_webhook_url(&self, url_id: UrlId) -> Result<Option<WebhookUrl>> {
        let webhook = sqlx::query_as::<_, WebhookUrl>(
            r#"
            UPDATE webhook_urls
            SET is_active = NOT is_active, updated_at = NOW()
            WHERE url_id = $1
            RETURNING *
            "#,
        )
        .bind(url_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(webhook)
    }

    #[instrument(
        skip(self, request),
        fields(merchant_id = request.merchant_id, transaction_id = request.transaction_id, idempotency_key = %request.idempotency_key),
        err
    )]
    async fn insert_execution(&self, request: &NotificationExecutionCreateDBRequest) -> Result<NotificationExecution> {
        let execution = sqlx::query_as::<_, NotificationExecution>(
            r#"
            INSERT INTO notification_executions (
                merchant_id, url_id, notification_type, transaction_id, amount,
                transaction_status, idempotency_key, check_sum, notification_status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(request.merchant_id)
        .bind(request.url_id)
        .bind(&request.notification_type)
        .bind(request.transaction_id)
        .bind(request.amount)
        .bind(&request.transaction_status)
        .bind(&request.idempotency_key)
        .bind(&request.check_sum)
        .bind(NotificationStatus::Pending.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(execution)
    }

    #[instrument(
        skip(self, update),
        fields(merchant_id = update.merchant_id, idempotency_key = %update.idempotency_key, status = %update.status),
        err
    )]
    async fn update_execution_status(&self, update: &NotificationStatusUpdate) -> Result<Option<NotificationExecution>> {
        let execution = sqlx::query_as::<_, NotificationExecution>(
            r#"
            UPDATE notification_executions
            SET notification_status = $4, attempts = $5, last_error = $6, updated_at = NOW()
            WHERE merchant_id = $1
              AND idempotency_key = $2
              AND transaction_id = $3
              AND notification_status = 'pending'
            RETURNING *
            "#,
        )
        .bind(update.merchant_id)
        .bind(&update.idempotency_key)
        .bind(update.transaction_id)
        .bind(update.status.as_str())
        .bind(update.attempts)
        .bind(&update.last_error)
        .fetch_optional(&self.pool)
        .await?;

        Ok(execution)
    }

    #[instrument(skip(self, statuses), err)]
    async fn count_executions(
        &self,
        merchant_id: MerchantId,
        transaction_id: TransactionId,
        statuses: &[NotificationStatus],
    ) -> Result<i64> {
        let statuses: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();

        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM notification_executions
            WHERE merchant_id = $1
              AND transaction_id = $2
              AND notification_status = ANY($3)
            "#,
        )
        .bind(merchant_id)
        .bind(transaction_id)
        .bind(statuses)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    #[instrument(skip(self), err)]
    async fn list_executions(
        &self,
        merchant_id: MerchantId,
        transaction_id: Option<TransactionId>,
    ) -> Result<Vec<NotificationExecution>> {
        let executions = sqlx::query_as::<_, NotificationExecution>(
            r#"
            SELECT * FROM notification_executions
            WHERE merchant_id = $1
              AND ($2::BIGINT IS NULL OR transaction_id = $2)
            ORDER BY created_at DESC, notification_id DESC
            "#,
        )
        .bind(merchant_id)
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(executions)
    }

    async fn close(&self) {
        tracing::info!("Closing database connections...");
        self.pool.close().await;
    }
}
