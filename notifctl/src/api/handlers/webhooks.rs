//! HTTP handlers for webhook URL endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use tracing::instrument;

use crate::{
    AppState,
    api::models::webhooks::{WebhookTestResponse, WebhookUrlCreate, WebhookUrlPathParams, WebhookUrlRef, WebhookUrlResponse},
    errors::Result,
    notifications::registry,
    types::UrlId,
};

/// Register a webhook URL.
#[utoipa::path(
    post,
    path = "/notif/create",
    tag = "webhooks",
    summary = "Register webhook URL",
    description = "Register the URL that receives one notification type for a merchant. \
    Registrations start inactive; send a test notification, then activate with `/notif/toggle`.",
    request_body = WebhookUrlCreate,
    responses(
        (status = 201, description = "Webhook URL registered", body = WebhookUrlResponse),
        (status = 400, description = "A required field is missing"),
        (status = 409, description = "The URL or the notification type is already registered for this merchant"),
        (status = 500, description = "Internal server error"),
    )
)]
#[instrument(skip_all)]
pub async fn create_webhook_url(
    State(state): State<AppState>,
    Json(request): Json<WebhookUrlCreate>,
) -> Result<(StatusCode, Json<WebhookUrlResponse>)> {
    let webhook = registry::register(state.dispatcher.storage(), request.into()).await?;
    Ok((StatusCode::CREATED, Json(webhook.into())))
}

/// Get a webhook URL registration.
#[utoipa::path(
    get,
    path = "/notif/{url_id}",
    tag = "webhooks",
    summary = "Get webhook URL",
    params(WebhookUrlPathParams),
    responses(
        (status = 200, description = "Webhook URL registration", body = WebhookUrlResponse),
        (status = 404, description = "Webhook URL not found"),
        (status = 500, description = "Internal server error"),
    )
)]
#[instrument(skip_all, fields(url_id = params.url_id))]
pub async fn get_webhook_url(State(state): State<AppState>, Path(params): Path<WebhookUrlPathParams>) -> Result<Json<WebhookUrlResponse>> {
    let webhook = registry::get_by_id(state.dispatcher.storage(), params.url_id).await?;
    Ok(Json(webhook.into()))
}

/// Flip a registration between active and inactive.
#[utoipa::path(
    post,
    path = "/notif/toggle",
    tag = "webhooks",
    summary = "Toggle webhook URL",
    description = "Activate an inactive registration or deactivate an active one. \
    Only active registrations receive dispatched notifications.",
    request_body = WebhookUrlRef,
    responses(
        (status = 200, description = "Registration after the toggle", body = WebhookUrlResponse),
        (status = 400, description = "url_id is missing"),
        (status = 404, description = "Webhook URL not found"),
        (status = 500, description = "Internal server error"),
    )
)]
#[instrument(skip_all)]
pub async fn toggle_webhook_url(State(state): State<AppState>, Json(request): Json<WebhookUrlRef>) -> Result<Json<WebhookUrlResponse>> {
    let webhook = registry::toggle_active(state.dispatcher.storage(), request.url_id).await?;
    Ok(Json(webhook.into()))
}

/// Send a sample notification to an inactive registration.
#[utoipa::path(
    post,
    path = "/notif/test",
    tag = "webhooks",
    summary = "Send test notification",
    description = "POST an unsigned sample notification to the registered URL once, without retries. \
    Only allowed while the registration is inactive. The result of the call is not reported back.",
    request_body = WebhookUrlRef,
    responses(
        (status = 202, description = "Test notification scheduled", body = WebhookTestResponse),
        (status = 400, description = "url_id is missing or the registration is active"),
        (status = 404, description = "Webhook URL not found"),
        (status = 500, description = "Internal server error"),
    )
)]
#[instrument(skip_all)]
pub async fn test_webhook_url(
    State(state): State<AppState>,
    Json(request): Json<WebhookUrlRef>,
) -> Result<(StatusCode, Json<WebhookTestResponse>)> {
    let url_id: UrlId = request.url_id;
    state.dispatcher.send_test(url_id).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(WebhookTestResponse {
            url_id,
            message: "Test notification scheduled".to_string(),
        }),
    ))
}
