//! # notifctl: Merchant Notification Dispatch
//!
//! `notifctl` notifies merchants about their transactions over HTTP webhooks. A merchant is
//! issued a signing key, registers one URL per notification type, and from then on receives a
//! signed JSON body whenever a transaction of that type is reported.
//!
//! ## Overview
//!
//! - **Signing keys**: one secret per merchant, reissued on demand
//!   ([`notifications::keys`])
//! - **Webhook registry**: URL per (merchant, notification type), inactive until toggled on
//!   ([`notifications::registry`])
//! - **Dispatch guard**: a transaction with a pending or successful notification is not
//!   dispatched again ([`notifications::guard`])
//! - **Signing**: MD5 `check_sum` over the notification fields and the merchant key
//!   ([`notifications::signing`])
//! - **Delivery**: background task, one attempt plus a fixed number of retries at a fixed delay
//!   ([`notifications::delivery`])
//! - **Execution ledger**: every dispatch is recorded as `pending` and finishes as `success` or
//!   `failed` ([`db`])
//!
//! ## Architecture
//!
//! The HTTP API ([`api`]) is a thin axum layer over [`notifications::NotificationDispatcher`],
//! which owns the storage backend ([`db::storage::Storage`], PostgreSQL or in-memory), the
//! outbound HTTP client and the set of running delivery tasks. Shutdown stops accepting
//! requests, then gives in-flight deliveries a grace period to finish.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use notifctl::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = notifctl::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     notifctl::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     }).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.

pub mod api;
pub mod config;
pub mod db;
pub mod errors;
mod metrics;
mod openapi;
pub mod notifications;
pub mod telemetry;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

use std::sync::Arc;

use axum::{
    Json, Router,
    routing::{get, post},
};
use bon::Builder;
pub use config::Config;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, debug, info};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::db::storage::{Storage, create_storage};
use crate::notifications::{HttpClient, NotificationDispatcher, ReqwestHttpClient, RetryPolicy};
use crate::openapi::ApiDoc;

/// Application state shared across all request handlers.
///
/// ```ignore
/// let state = AppState::builder()
///     .dispatcher(dispatcher)
///     .config(config)
///     .maybe_metrics_handle(handle)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub dispatcher: NotificationDispatcher,
    pub config: Config,
    /// Present when `enable_metrics` is set
    pub metrics_handle: Option<PrometheusHandle>,
}

/// Get the notifctl database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Build the application router with all endpoints.
///
/// - `/key/*`, `/notif/*`: the API (see [`api`])
/// - `/healthz`: liveness
/// - `/metrics`: Prometheus exposition, only with `enable_metrics`
/// - `/docs`, `/openapi.json`: API reference
pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/key/create", post(api::handlers::keys::create_key))
        .route("/notif/create", post(api::handlers::webhooks::create_webhook_url))
        .route("/notif/toggle", post(api::handlers::webhooks::toggle_webhook_url))
        .route("/notif/test", post(api::handlers::webhooks::test_webhook_url))
        .route("/notif/execute", post(api::handlers::notifications::execute_notification))
        .route("/notif/executions", get(api::handlers::notifications::list_executions))
        .route("/notif/{url_id}", get(api::handlers::webhooks::get_webhook_url))
        .route("/healthz", get(|| async { "OK" }))
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    if state.metrics_handle.is_some() {
        router = router.route("/metrics", get(crate::metrics::render));
    }

    router.with_state(state).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    )
}

/// The notification service, from startup to graceful shutdown.
///
/// 1. **Create**: [`Application::new`] connects storage (running migrations for PostgreSQL),
///    builds the dispatcher and the router
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and handles requests
/// 3. **Shutdown**: once the shutdown signal fires, in-flight deliveries get
///    `notifications.shutdown_grace` to finish before storage and telemetry are closed
pub struct Application {
    router: Router,
    config: Config,
    dispatcher: NotificationDispatcher,
    storage: Arc<dyn Storage>,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting notifctl with configuration: {:#?}", config);

        let storage = create_storage(&config.database).await?;
        let http_client = Arc::new(ReqwestHttpClient::new(config.notifications.request_timeout)?);

        Self::new_with_storage(config, storage, http_client)
    }

    /// Create an application over existing storage and HTTP client.
    pub fn new_with_storage(config: Config, storage: Arc<dyn Storage>, http_client: Arc<dyn HttpClient>) -> anyhow::Result<Self> {
        let policy = RetryPolicy::from(&config.notifications);
        let dispatcher = NotificationDispatcher::new(storage.clone(), http_client, policy);

        let metrics_handle = if config.enable_metrics {
            Some(crate::metrics::get_or_install_prometheus_handle()?)
        } else {
            None
        };

        let app_state = AppState::builder()
            .dispatcher(dispatcher.clone())
            .config(config.clone())
            .maybe_metrics_handle(metrics_handle)
            .build();

        Ok(Self {
            router: build_router(app_state),
            config,
            dispatcher,
            storage,
        })
    }

    /// Convert application into a test server (for tests)
    #[cfg(any(test, feature = "test-utils"))]
    pub fn into_test_server(self) -> (axum_test::TestServer, NotificationDispatcher) {
        let server = axum_test::TestServer::new(self.router.into_make_service()).expect("Failed to create test server");
        (server, self.dispatcher)
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "notifctl listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        // Let in-flight deliveries finish (or record themselves as abandoned)
        self.dispatcher.shutdown(self.config.notifications.shutdown_grace).await;

        info!("Closing storage...");
        self.storage.close().await;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::*;
    use crate::db::models::notifications::NotificationStatus;
    use crate::db::storage::{InMemoryStorage, Storage};
    use crate::notifications::http::{DeliveryError, MockHttpClient};
    use crate::test_utils::{create_active_webhook, create_test_app, create_test_config};
    use serde_json::json;

    #[tokio::test]
    async fn test_healthz() {
        let app = create_test_app();

        let response = app.server.get("/healthz").await;
        response.assert_status_ok();
        assert_eq!(response.text(), "OK");
    }

    #[tokio::test]
    async fn test_openapi_and_docs_served() {
        let app = create_test_app();

        let response = app.server.get("/openapi.json").await;
        response.assert_status_ok();
        let doc: serde_json::Value = response.json();
        assert!(doc["paths"]["/notif/execute"].is_object());

        app.server.get("/docs").await.assert_status_ok();
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let app = create_test_app();
        app.server.get("/notif/create/extra").await.assert_status_not_found();
    }

    /// Key issuance through a full dispatch, then a second dispatch for the same transaction.
    #[test_log::test(tokio::test)]
    async fn test_end_to_end_refund_notification() {
        let app = create_test_app();

        let key: serde_json::Value = app.server.post("/key/create").json(&json!({"merchant_id": 10})).await.json();
        let key = key["key"].as_str().unwrap().to_string();

        let webhook: serde_json::Value = app
            .server
            .post("/notif/create")
            .json(&json!({"merchant_id": 10, "url": "https://shop.example/hooks/refund", "notification_type": "refund"}))
            .await
            .json();
        let url_id = webhook["url_id"].as_i64().unwrap();

        app.server.post("/notif/test").json(&json!({"url_id": url_id})).await.assert_status(axum::http::StatusCode::ACCEPTED);
        app.server.post("/notif/toggle").json(&json!({"url_id": url_id})).await.assert_status_ok();

        let body = json!({
            "merchant_id": 10,
            "transaction_id": 2323,
            "notification_type": "refund",
            "amount": 10000.0,
            "transaction_status": "success",
        });
        app.server.post("/notif/execute").json(&body).await.assert_status(axum::http::StatusCode::ACCEPTED);
        app.dispatcher.wait_for_deliveries().await;

        app.server.post("/notif/execute").json(&body).await.assert_status(axum::http::StatusCode::CONFLICT);

        let calls = app.http.calls();
        assert_eq!(calls.len(), 2, "one test send and one delivery");
        let delivered = &calls[1].body;
        assert_eq!(
            delivered["check_sum"],
            notifications::signing::sign("refund", 2323, 10000.0, "success", &key).as_str()
        );
        assert!(delivered["check_sum"].as_str().is_some_and(|sum| sum.len() == 32));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatcher_shutdown_records_abandoned_delivery() {
        let storage = Arc::new(InMemoryStorage::new());
        let http = MockHttpClient::new();
        http.push_error(DeliveryError::Timeout(Duration::from_secs(10)));

        let app = Application::new_with_storage(create_test_config(), storage.clone(), Arc::new(http.clone())).unwrap();
        let (server, dispatcher) = app.into_test_server();
        create_active_webhook(storage.as_ref(), 4, "refund", "https://merchant.example/r").await;

        server
            .post("/notif/execute")
            .json(&json!({
                "merchant_id": 4,
                "transaction_id": 8,
                "notification_type": "refund",
                "amount": 1.0,
                "transaction_status": "success",
            }))
            .await
            .assert_status(axum::http::StatusCode::ACCEPTED);

        // Let the first attempt fail so the task is waiting to retry
        tokio::task::yield_now().await;
        dispatcher.shutdown(Duration::from_secs(30)).await;

        let rows = storage.list_executions(4, Some(8)).await.unwrap();
        assert_eq!(rows[0].status(), NotificationStatus::Failed);
        assert_eq!(http.call_count(), 1);
    }
}
