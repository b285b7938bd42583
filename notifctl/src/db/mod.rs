//! Persistence layer.
//!
//! - [`errors`]: [`DbError`](errors::DbError), a categorised view of storage failures
//! - [`models`]: row structs shared by every backend
//! - [`storage`]: the [`Storage`](storage::Storage) trait with PostgreSQL and in-memory backends

pub mod errors;
pub mod models;
pub mod storage;
