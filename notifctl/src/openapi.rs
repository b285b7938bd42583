//! OpenAPI documentation for the HTTP API, rendered with Scalar at `/docs`.

use utoipa::OpenApi;

use crate::api;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "notifctl",
        description = "Merchant notification dispatch.

Merchants register one webhook URL per notification type and receive a signed JSON body for every \
transaction notification. Each body carries a `check_sum` (MD5 over the notification fields and the \
merchant signing key) and an `idempotency_key` for de-duplication on the receiving side."
    ),
    paths(
        api::handlers::keys::create_key,
        api::handlers::webhooks::create_webhook_url,
        api::handlers::webhooks::get_webhook_url,
        api::handlers::webhooks::toggle_webhook_url,
        api::handlers::webhooks::test_webhook_url,
        api::handlers::notifications::execute_notification,
        api::handlers::notifications::list_executions,
    ),
    components(schemas(
        api::models::keys::KeyCreate,
        api::models::keys::KeyResponse,
        api::models::webhooks::WebhookUrlCreate,
        api::models::webhooks::WebhookUrlRef,
        api::models::webhooks::WebhookUrlResponse,
        api::models::webhooks::WebhookTestResponse,
        api::models::notifications::NotificationExecute,
        api::models::notifications::NotificationExecutionResponse,
    )),
    tags(
        (name = "keys", description = "Merchant signing keys"),
        (name = "webhooks", description = "Webhook URL registration and activation"),
        (name = "notifications", description = "Notification dispatch and the execution ledger"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_routes_documented() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();

        for path in [
            "/key/create",
            "/notif/create",
            "/notif/{url_id}",
            "/notif/toggle",
            "/notif/test",
            "/notif/execute",
            "/notif/executions",
        ] {
            assert!(paths.contains(&path), "{path} missing from {paths:?}");
        }
    }
}
