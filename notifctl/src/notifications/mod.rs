//! Merchant transaction notifications.
//!
//! This module is the core of the service:
//!
//! - [`keys`]: per-merchant signing keys and per-dispatch idempotency keys
//! - [`registry`]: webhook URL registration, lookup and activation
//! - [`guard`]: admission check against duplicate or overlapping dispatch
//! - [`signing`]: the MD5 `check_sum` carried by every notification
//! - [`delivery`]: the retry state machine for a single notification
//! - [`dispatcher`]: ties the above together and owns the delivery tasks
//! - [`http`]: outbound HTTP client abstraction
//! - [`events`]: the JSON bodies merchants receive
//!
//! # Delivery guarantees
//!
//! A transaction is reported at most once successfully per merchant: the guard refuses a new
//! dispatch while an earlier one is pending or has succeeded. Each dispatch makes one initial
//! attempt followed by a fixed number of retries at a fixed delay, then ends as `success` or
//! `failed` in the execution ledger. Merchants de-duplicate on the `idempotency_key` in the body.

pub mod delivery;
pub mod dispatcher;
pub mod events;
pub mod guard;
pub mod http;
pub mod keys;
pub mod registry;
pub mod signing;

pub use delivery::RetryPolicy;
pub use dispatcher::{DispatchRequest, NotificationDispatcher};
pub use http::{HttpClient, ReqwestHttpClient};
