//! Prometheus exposition of the counters recorded through the `metrics` facade.
//!
//! Counters are recorded inline where the events happen:
//!
//! - `notifctl_notifications_dispatched_total`: dispatches admitted to delivery
//! - `notifctl_notification_attempts_total{outcome}`: individual webhook calls
//! - `notifctl_notifications_total{status}`: deliveries reaching a terminal status
//! - `notifctl_signing_keys_issued_total`: signing keys issued
//!
//! Until a recorder is installed these are no-ops.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use metrics::describe_counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use parking_lot::Mutex;

use crate::AppState;

/// The process-wide recorder can only be installed once.
static PROMETHEUS_HANDLE: Mutex<Option<PrometheusHandle>> = parking_lot::const_mutex(None);

/// Install the global Prometheus recorder on first use and return its handle.
pub fn get_or_install_prometheus_handle() -> anyhow::Result<PrometheusHandle> {
    let mut slot = PROMETHEUS_HANDLE.lock();
    if let Some(handle) = slot.as_ref() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    describe_metrics();
    *slot = Some(handle.clone());

    Ok(handle)
}

fn describe_metrics() {
    describe_counter!(
        "notifctl_notifications_dispatched_total",
        "Notifications admitted and scheduled for delivery"
    );
    describe_counter!(
        "notifctl_notification_attempts_total",
        "Webhook calls made, labelled by outcome (success, failure)"
    );
    describe_counter!(
        "notifctl_notifications_total",
        "Notifications reaching a terminal status, labelled by status (success, failed)"
    );
    describe_counter!("notifctl_signing_keys_issued_total", "Merchant signing keys issued");
}

/// `GET /metrics`
pub async fn render(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics_handle {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, String::new()),
    }
}
