//! Common type definitions.
//!
//! All identifiers in this service are positive 64-bit integers assigned either by the caller
//! (merchants, transactions) or by the database (webhook registrations, executions). A value of
//! zero means "not provided" and is rejected by validation.
//!
//! - [`MerchantId`]: Merchant identifier, supplied by the caller
//! - [`TransactionId`]: Transaction identifier, supplied by the caller
//! - [`UrlId`]: Webhook registration identifier
//! - [`NotificationId`]: Execution ledger row identifier

pub type MerchantId = i64;
pub type TransactionId = i64;
pub type UrlId = i64;
pub type NotificationId = i64;

/// Abbreviate an opaque key to its first 8 characters for logs and traces.
///
/// Signing keys must never be logged in full.
pub fn abbrev_key(key: &str) -> String {
    key.chars().take(8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abbrev_key() {
        assert_eq!(abbrev_key("1234567890abcdef"), "12345678");
        assert_eq!(abbrev_key("short"), "short");
        assert_eq!(abbrev_key(""), "");
    }
}
