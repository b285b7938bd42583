//! HTTP handlers for notification dispatch and the execution ledger.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use tracing::instrument;

use crate::{
    AppState,
    api::models::notifications::{ListExecutionsQuery, NotificationExecute, NotificationExecutionResponse},
    errors::Result,
    notifications::DispatchRequest,
};

/// Dispatch a transaction notification.
#[utoipa::path(
    post,
    path = "/notif/execute",
    tag = "notifications",
    summary = "Dispatch notification",
    description = "Sign and record a notification for the merchant's active webhook of this type, then deliver it \
    in the background with bounded retries. The response is the pending ledger entry; follow the delivery through \
    `/notif/executions`. A transaction whose notification is pending or already delivered is rejected.",
    request_body = NotificationExecute,
    responses(
        (status = 202, description = "Notification accepted for delivery", body = NotificationExecutionResponse),
        (status = 400, description = "A required field is missing or the webhook is inactive"),
        (status = 409, description = "A notification for this transaction is pending or already delivered"),
        (status = 422, description = "The merchant has no webhook or signing key for this notification type"),
        (status = 500, description = "Internal server error"),
    )
)]
#[instrument(skip_all)]
pub async fn execute_notification(
    State(state): State<AppState>,
    Json(request): Json<NotificationExecute>,
) -> Result<(StatusCode, Json<NotificationExecutionResponse>)> {
    let request: DispatchRequest = request.into();
    let execution = state.dispatcher.dispatch(&request).await?;
    Ok((StatusCode::ACCEPTED, Json(execution.into())))
}

/// List notification executions.
#[utoipa::path(
    get,
    path = "/notif/executions",
    tag = "notifications",
    summary = "List executions",
    description = "List a merchant's notification executions, newest first.",
    params(ListExecutionsQuery),
    responses(
        (status = 200, description = "Execution ledger entries", body = [NotificationExecutionResponse]),
        (status = 400, description = "merchant_id is missing"),
        (status = 500, description = "Internal server error"),
    )
)]
#[instrument(skip_all, fields(merchant_id = query.merchant_id, transaction_id = ?query.transaction_id))]
pub async fn list_executions(
    State(state): State<AppState>,
    Query(query): Query<ListExecutionsQuery>,
) -> Result<Json<Vec<NotificationExecutionResponse>>> {
    let executions = state.dispatcher.list_executions(query.merchant_id, query.transaction_id).await?;
    Ok(Json(executions.into_iter().map(Into::into).collect()))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::api::models::notifications::NotificationExecutionResponse;
    use crate::db::models::notifications::NotificationStatus;
    use crate::notifications::http::DeliveryError;
    use crate::notifications::signing;
    use crate::test_utils::{create_active_webhook, create_test_app};
    use axum::http::StatusCode;
    use serde_json::json;

    fn refund(transaction_id: i64) -> serde_json::Value {
        json!({
            "merchant_id": 1,
            "transaction_id": transaction_id,
            "notification_type": "refund",
            "amount": 10000.0,
            "transaction_status": "success",
        })
    }

    #[tokio::test]
    async fn test_execute_and_follow_delivery() {
        let app = create_test_app();
        let (key, webhook) = create_active_webhook(app.storage.as_ref(), 1, "refund", "https://merchant.example/refund").await;

        let response = app.server.post("/notif/execute").json(&refund(2323)).await;
        response.assert_status(StatusCode::ACCEPTED);
        let execution: NotificationExecutionResponse = response.json();
        assert_eq!(execution.notification_status, NotificationStatus::Pending);
        assert_eq!(execution.url_id, webhook.url_id);
        assert_eq!(execution.check_sum, signing::sign("refund", 2323, 10000.0, "success", &key));

        app.dispatcher.wait_for_deliveries().await;

        let listed: Vec<NotificationExecutionResponse> = app
            .server
            .get("/notif/executions")
            .add_query_param("merchant_id", 1)
            .add_query_param("transaction_id", 2323)
            .await
            .json();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].idempotency_key, execution.idempotency_key);
        assert_eq!(listed[0].notification_status, NotificationStatus::Success);
        assert_eq!(listed[0].attempts, 1);

        let calls = app.http.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].body["idempotency_key"], execution.idempotency_key.as_str());
        assert_eq!(calls[0].body["check_sum"], execution.check_sum.as_str());
    }

    #[tokio::test]
    async fn test_execute_validation() {
        let app = create_test_app();

        let response = app.server.post("/notif/execute").json(&json!({"merchant_id": 1})).await;
        response.assert_status_bad_request();
        response.assert_json(&json!({"message": "transaction_id is required"}));

        let response = app.server.post("/notif/execute").json(&json!({"transaction_id": 9})).await;
        response.assert_json(&json!({"message": "merchant_id is required"}));
    }

    #[tokio::test]
    async fn test_execute_without_webhook() {
        let app = create_test_app();

        let response = app.server.post("/notif/execute").json(&refund(1)).await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        response.assert_json(&json!({"message": "Merchant does not have the notification webhook yet"}));
    }

    #[tokio::test]
    async fn test_execute_inactive_webhook() {
        let app = create_test_app();
        let (_, webhook) = create_active_webhook(app.storage.as_ref(), 1, "refund", "https://merchant.example/refund").await;
        app.server.post("/notif/toggle").json(&json!({"url_id": webhook.url_id})).await.assert_status_ok();

        let response = app.server.post("/notif/execute").json(&refund(1)).await;
        response.assert_status_bad_request();
        response.assert_json(&json!({"message": "URL status is inactive"}));
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_execute_conflicts_while_pending() {
        let app = create_test_app();
        create_active_webhook(app.storage.as_ref(), 1, "refund", "https://merchant.example/refund").await;
        app.http.push_error(DeliveryError::Transport("connection refused".to_string()));

        app.server.post("/notif/execute").json(&refund(77)).await.assert_status(StatusCode::ACCEPTED);
        app.server.post("/notif/execute").json(&refund(77)).await.assert_status(StatusCode::CONFLICT);

        // The retry after 5s succeeds
        tokio::time::sleep(Duration::from_secs(6)).await;
        app.dispatcher.wait_for_deliveries().await;

        let listed: Vec<NotificationExecutionResponse> = app
            .server
            .get("/notif/executions")
            .add_query_param("merchant_id", 1)
            .await
            .json();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].notification_status, NotificationStatus::Success);
        assert_eq!(listed[0].attempts, 2);
    }

    #[tokio::test]
    async fn test_list_requires_merchant() {
        let app = create_test_app();

        let response = app.server.get("/notif/executions").await;
        response.assert_status_bad_request();
        response.assert_json(&json!({"message": "merchant_id is required"}));
    }
}
