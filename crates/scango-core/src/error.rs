//! # Error Types
//!
//! Errors raised by the foundational types. Each is reported to the caller
//! before any state is mutated.

use thiserror::Error;

/// Malformed input rejected at a trust boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Receipt numbers are non-empty, at most 64 characters, `[A-Za-z0-9-]`.
    #[error("invalid receipt number: \"{0}\"")]
    InvalidReceiptNumber(String),

    /// Order hashes are `0x` followed by 64 hex digits.
    #[error("invalid order hash: \"{0}\" (expected 0x followed by 64 hex digits)")]
    InvalidOrderHash(String),

    /// Store identifiers must be non-empty after trimming.
    #[error("store id must be non-empty")]
    EmptyStoreId,

    /// Wallet addresses are `0x` followed by 40 hex digits.
    #[error("invalid wallet address: \"{0}\" (expected 0x followed by 40 hex digits)")]
    InvalidWalletAddress(String),

    /// Transaction references must be non-empty.
    #[error("transaction reference must be non-empty")]
    EmptyTxRef,

    /// Cart contained no line items.
    #[error("cart must contain at least one item")]
    EmptyCart,

    /// A line item failed validation.
    #[error("invalid line item at index {index}: {reason}")]
    InvalidLineItem { index: usize, reason: String },

    /// Order total must be finite and strictly positive.
    #[error("total must be a positive amount, got {0}")]
    InvalidTotal(f64),

    /// Payment method was not one of CASH, CARD, UPI.
    #[error("unknown payment method: \"{0}\"")]
    UnknownPaymentMethod(String),

    /// Reward mints must carry a positive amount.
    #[error("reward amount must be positive")]
    NonPositiveRewardAmount,

    /// Receipt status was not one of PENDING, PAID, VERIFIED.
    #[error("unknown receipt status: \"{0}\"")]
    UnknownReceiptStatus(String),
}

/// The OS entropy source could not supply random bytes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("entropy source unavailable: {0}")]
pub struct EntropyError(pub String);

/// Failure to mint an order hash.
#[derive(Error, Debug)]
pub enum OrderHashError {
    /// The OS entropy source could not supply the nonce.
    #[error(transparent)]
    Entropy(#[from] EntropyError),

    /// The hash preimage could not be serialized.
    #[error("order payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure to decode a scanned exit-proof payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProofDecodeError {
    /// Payload is not valid JSON.
    #[error("proof payload is not valid JSON: {0}")]
    Malformed(String),

    /// Payload is JSON but not an object.
    #[error("proof payload must be a JSON object")]
    NotAnObject,

    /// A required field is absent.
    #[error("proof payload is missing field `{0}`")]
    MissingField(&'static str),

    /// A required field is present but not a non-empty string.
    #[error("proof field `{0}` must be a non-empty string")]
    InvalidField(&'static str),

    /// The payload carries a key outside the proof schema.
    #[error("proof payload has unexpected field `{0}`")]
    UnexpectedField(String),
}
