//! HTTP handlers for signing key endpoints.

use axum::{extract::State, response::Json};
use tracing::instrument;

use crate::{
    AppState,
    api::models::keys::{KeyCreate, KeyResponse},
    errors::Result,
    notifications::keys,
};

/// Issue a signing key for a merchant.
#[utoipa::path(
    post,
    path = "/key/create",
    tag = "keys",
    summary = "Issue signing key",
    description = "Generate a new signing key for the merchant, replacing any previous key. \
    Notifications dispatched afterwards are signed with the new key.",
    request_body = KeyCreate,
    responses(
        (status = 200, description = "Key issued", body = KeyResponse),
        (status = 400, description = "merchant_id is missing"),
        (status = 500, description = "Internal server error"),
    )
)]
#[instrument(skip_all)]
pub async fn create_key(State(state): State<AppState>, Json(request): Json<KeyCreate>) -> Result<Json<KeyResponse>> {
    let key = keys::issue_key(state.dispatcher.storage(), request.merchant_id).await?;

    Ok(Json(KeyResponse {
        merchant_id: request.merchant_id,
        key,
    }))
}

#[cfg(test)]
mod tests {
    use crate::api::models::keys::KeyResponse;
    use crate::db::storage::Storage;
    use crate::test_utils::create_test_app;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_key() {
        let app = create_test_app();

        let response = app.server.post("/key/create").json(&json!({"merchant_id": 42})).await;
        response.assert_status_ok();

        let body: KeyResponse = response.json();
        assert_eq!(body.merchant_id, 42);
        assert!(body.key.starts_with("42"));

        let stored = app.storage.get_merchant(42).await.unwrap().unwrap();
        assert_eq!(stored.signing_key.as_deref(), Some(body.key.as_str()));
    }

    #[tokio::test]
    async fn test_reissue_replaces_key() {
        let app = create_test_app();

        let first: KeyResponse = app.server.post("/key/create").json(&json!({"merchant_id": 5})).await.json();
        let second: KeyResponse = app.server.post("/key/create").json(&json!({"merchant_id": 5})).await.json();
        assert_ne!(first.key, second.key);

        let stored = app.storage.get_merchant(5).await.unwrap().unwrap();
        assert_eq!(stored.signing_key, Some(second.key));
    }

    #[tokio::test]
    async fn test_missing_merchant_id() {
        let app = create_test_app();

        let response = app.server.post("/key/create").json(&json!({})).await;
        response.assert_status_bad_request();
        response.assert_json(&json!({"message": "merchant_id is required"}));
    }
}
