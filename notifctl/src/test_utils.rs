//! Test utilities for integration testing (available with `test-utils` feature).

use std::sync::Arc;

use axum_test::TestServer;

use crate::config::{Config, DatabaseConfig};
use crate::db::models::webhooks::{WebhookUrl, WebhookUrlCreateDBRequest};
use crate::db::storage::{InMemoryStorage, Storage};
use crate::notifications::http::MockHttpClient;
use crate::notifications::{NotificationDispatcher, keys, registry};
use crate::types::MerchantId;

/// A router over in-memory storage and a mock HTTP client, with handles to both.
pub struct TestApp {
    pub server: TestServer,
    pub storage: Arc<InMemoryStorage>,
    pub http: MockHttpClient,
    pub dispatcher: NotificationDispatcher,
}

pub fn create_test_config() -> Config {
    Config {
        database: DatabaseConfig::InMemory,
        enable_metrics: false,
        enable_otel_export: false,
        ..Default::default()
    }
}

pub fn create_test_app() -> TestApp {
    create_test_app_with_config(create_test_config())
}

pub fn create_test_app_with_config(config: Config) -> TestApp {
    let storage = Arc::new(InMemoryStorage::new());
    let http = MockHttpClient::new();

    let app = crate::Application::new_with_storage(config, storage.clone(), Arc::new(http.clone()))
        .expect("Failed to create application");
    let (server, dispatcher) = app.into_test_server();

    TestApp {
        server,
        storage,
        http,
        dispatcher,
    }
}

/// Issue a signing key for `merchant_id` and register an active webhook for `notification_type`.
///
/// Returns the signing key and the registration.
pub async fn create_active_webhook(
    storage: &dyn Storage,
    merchant_id: MerchantId,
    notification_type: &str,
    url: &str,
) -> (String, WebhookUrl) {
    let key = keys::issue_key(storage, merchant_id).await.expect("Failed to issue key");
    let webhook = registry::register(
        storage,
        WebhookUrlCreateDBRequest {
            merchant_id,
            url: url.to_string(),
            notification_type: notification_type.to_string(),
        },
    )
    .await
    .expect("Failed to register webhook");
    let webhook = registry::toggle_active(storage, webhook.url_id)
        .await
        .expect("Failed to activate webhook");

    (key, webhook)
}
