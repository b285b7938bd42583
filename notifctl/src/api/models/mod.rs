//! API request and response models.
//!
//! Request bodies default missing fields to zero or empty so that validation reports which
//! field is required instead of failing deserialization.

pub mod keys;
pub mod notifications;
pub mod webhooks;
