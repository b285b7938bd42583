//! Database record models matching table schemas.
//!
//! These structs correspond directly to table rows and derive `sqlx::FromRow` so the
//! PostgreSQL store can return them from queries. The in-memory store keeps the same structs,
//! which keeps both storage backends interchangeable behind [`crate::db::storage::Storage`].
//!
//! - [`merchants`]: Merchants and their current signing key
//! - [`webhooks`]: Webhook URL registrations per merchant and notification type
//! - [`notifications`]: The execution ledger of admitted dispatches

pub mod merchants;
pub mod notifications;
pub mod webhooks;
