//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Request/response bodies
//!
//! # API Structure
//!
//! - **Keys** (`/key/*`): merchant signing key issuance
//! - **Webhooks** (`/notif/create`, `/notif/{url_id}`, `/notif/toggle`, `/notif/test`): registration
//!   and activation of merchant webhook URLs
//! - **Notifications** (`/notif/execute`, `/notif/executions`): dispatch and ledger inspection
//!
//! All endpoints are documented with `utoipa`; the rendered reference is served at `/docs`.

pub mod handlers;
pub mod models;
