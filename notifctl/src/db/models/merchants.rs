//! Database models for merchants and their signing keys.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::types::MerchantId;

/// Database model for a merchant.
///
/// A merchant row is created by the first key issuance. `signing_key` is the only key used for
/// signing new dispatches; issuing a new key replaces it.
#[derive(Debug, Clone, FromRow)]
pub struct Merchant {
    pub merchant_id: MerchantId,
    pub signing_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
