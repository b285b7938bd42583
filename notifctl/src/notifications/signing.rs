//! Payload checksums for outbound notifications.
//!
//! Every dispatched payload carries a `check_sum` that lets the merchant verify it came from us
//! and was not altered. The checksum is the lowercase hex MD5 digest of the canonical string
//!
//! ```text
//! {notification_type}{transaction_id}{amount:.2}{transaction_status}{merchant_key}
//! ```
//!
//! where `transaction_id` is rendered in decimal and `amount` with exactly two fraction
//! digits. This format is part of the wire contract with merchants and must not change.

use md5::{Digest, Md5};

use crate::types::TransactionId;

/// Build the canonical string the checksum is computed over.
pub fn canonical_string(
    notification_type: &str,
    transaction_id: TransactionId,
    amount: f64,
    transaction_status: &str,
    merchant_key: &str,
) -> String {
    format!("{notification_type}{transaction_id}{amount:.2}{transaction_status}{merchant_key}")
}

/// Compute the checksum for a notification.
pub fn sign(notification_type: &str, transaction_id: TransactionId, amount: f64, transaction_status: &str, merchant_key: &str) -> String {
    let canonical = canonical_string(notification_type, transaction_id, amount, transaction_status, merchant_key);
    format!("{:x}", Md5::digest(canonical.as_bytes()))
}

/// Verify a checksum received with a notification.
///
/// This is what a receiving merchant runs; it is exposed so integrations can be tested against
/// the exact same routine.
pub fn verify(
    notification_type: &str,
    transaction_id: TransactionId,
    amount: f64,
    transaction_status: &str,
    merchant_key: &str,
    check_sum: &str,
) -> bool {
    let expected = sign(notification_type, transaction_id, amount, transaction_status, merchant_key);
    constant_time_eq(expected.as_bytes(), check_sum.to_ascii_lowercase().as_bytes())
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
