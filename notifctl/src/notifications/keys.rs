//! Signing key issuance and idempotency key generation.

use chrono::Utc;
use metrics::counter;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::db::storage::Storage;
use crate::errors::{Error, Result};
use crate::types::{MerchantId, abbrev_key};

/// Generate a fresh signing key for a merchant.
///
/// Keys are `{merchant_id}{uuid_v4}{unix_seconds}`; the UUID makes them unique and
/// unpredictable.
pub fn generate_signing_key(merchant_id: MerchantId) -> String {
    format!("{}{}{}", merchant_id, Uuid::new_v4(), Utc::now().timestamp())
}

/// Generate the idempotency key embedded in a dispatched payload.
pub fn generate_idempotency_key() -> String {
    format!("{}{}", Uuid::new_v4(), Utc::now().timestamp())
}

/// Issue a new signing key for a merchant, replacing any previous one.
///
/// Executions already recorded keep the checksum computed with the key current at their
/// admission.
#[instrument(skip(storage), err)]
pub async fn issue_key(storage: &dyn Storage, merchant_id: MerchantId) -> Result<String> {
    if merchant_id <= 0 {
        return Err(Error::required("merchant_id"));
    }

    let key = generate_signing_key(merchant_id);
    storage.upsert_signing_key(merchant_id, &key).await.map_err(|e| {
        tracing::error!(error = %e, merchant_id, "Failed to store signing key");
        Error::Internal {
            operation: format!("store signing key for merchant {merchant_id}"),
        }
    })?;

    counter!("notifctl_signing_keys_issued_total").increment(1);
    info!(merchant_id, key = %abbrev_key(&key), "Issued merchant signing key");

    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::storage::InMemoryStorage;

    #[test]
    fn test_signing_key_format() {
        let key = generate_signing_key(42);
        assert!(key.starts_with("42"));

        // uuid (36 chars) followed by unix seconds
        let rest = &key[2..];
        assert!(Uuid::parse_str(&rest[..36]).is_ok());
        assert!(rest[36..].parse::<i64>().is_ok());
    }

    #[test]
    fn test_keys_are_unique() {
        assert_ne!(generate_signing_key(1), generate_signing_key(1));
        assert_ne!(generate_idempotency_key(), generate_idempotency_key());
    }

    #[test]
    fn test_idempotency_key_format() {
        let key = generate_idempotency_key();
        assert!(Uuid::parse_str(&key[..36]).is_ok());
        assert!(key[36..].parse::<i64>().is_ok());
    }

    #[tokio::test]
    async fn test_issue_key_persists_and_overwrites() {
        let storage = InMemoryStorage::new();

        let first = issue_key(&storage, 9).await.unwrap();
        let second = issue_key(&storage, 9).await.unwrap();
        assert_ne!(first, second);

        let merchant = storage.get_merchant(9).await.unwrap().unwrap();
        assert_eq!(merchant.signing_key, Some(second));
    }

    #[tokio::test]
    async fn test_issue_key_rejects_missing_merchant() {
        let storage = InMemoryStorage::new();

        let err = issue_key(&storage, 0).await.unwrap_err();
        assert!(matches!(err, Error::BadRequest { ref message } if message == "merchant_id is required"));
        assert!(storage.get_merchant(0).await.unwrap().is_none());
    }
}
