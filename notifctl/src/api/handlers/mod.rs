//! HTTP request handlers for all API endpoints.
//!
//! Handlers deserialize the request, call into [`crate::notifications`] and map the result to a
//! response. Errors are returned as [`crate::errors::Error`], which renders a JSON
//! `{"message": ...}` body with the matching status code.
//!
//! # Handler Modules
//!
//! - [`keys`]: merchant signing key issuance
//! - [`webhooks`]: webhook URL registration, lookup, activation and test sends
//! - [`notifications`]: notification dispatch and execution ledger inspection

pub mod keys;
pub mod notifications;
pub mod webhooks;
