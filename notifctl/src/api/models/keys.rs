//! API request and response models for signing key endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::types::MerchantId;

/// Request to issue a signing key.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct KeyCreate {
    pub merchant_id: MerchantId,
}

/// Newly issued signing key. Shown once; issuing again replaces it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct KeyResponse {
    pub merchant_id: MerchantId,
    pub key: String,
}
