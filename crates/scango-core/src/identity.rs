//! # Domain Identity Newtypes
//!
//! Newtype wrappers for the identifiers that cross trust boundaries. You
//! cannot pass a `ReceiptNumber` where an `OrderHash` is expected, and none of
//! them can be constructed from a string without validation.
//!
//! Serde deserialization goes through the same validated constructors, so a
//! request body with a malformed identifier fails to parse instead of
//! producing an invalid value.

use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::error::{EntropyError, ValidationError};

const RECEIPT_PREFIX: &str = "RCP-";
const OFFLINE_PREFIX: &str = "OFFLINE-";

fn is_hex_body(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_hexdigit())
}

// -- ReceiptNumber ------------------------------------------------------------

/// Store-scoped, human-readable receipt identifier (e.g. `RCP-042917`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReceiptNumber(String);

impl ReceiptNumber {
    /// Parse a receipt number from untrusted input.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidReceiptNumber`] if the value is empty,
    /// longer than 64 characters, or contains characters outside `[A-Za-z0-9-]`.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        let valid = !s.is_empty()
            && s.len() <= 64
            && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-');
        if valid {
            Ok(Self(s))
        } else {
            Err(ValidationError::InvalidReceiptNumber(s))
        }
    }

    /// Generate a fresh `RCP-` + 6 digit receipt number from the OS RNG.
    ///
    /// Uniqueness is not guaranteed here; the ledger rejects duplicates and
    /// the caller regenerates.
    pub fn generate() -> Result<Self, EntropyError> {
        let mut buf = [0u8; 4];
        OsRng
            .try_fill_bytes(&mut buf)
            .map_err(|e| EntropyError(e.to_string()))?;
        let n = u32::from_le_bytes(buf) % 1_000_000;
        Ok(Self(format!("{RECEIPT_PREFIX}{n:06}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// -- OrderHash ----------------------------------------------------------------

/// Opaque order identifier: `0x` followed by 64 lowercase hex digits.
///
/// Doubles as the external-ledger key and the reward idempotency key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderHash(String);

impl OrderHash {
    /// Parse an order hash, normalizing hex digits to lowercase.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidOrderHash`] for any other shape.
    pub fn parse(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        match s.strip_prefix("0x") {
            Some(body) if is_hex_body(body, 64) => Ok(Self(s.to_ascii_lowercase())),
            _ => Err(ValidationError::InvalidOrderHash(s)),
        }
    }

    /// Build from a raw 32-byte digest.
    pub fn from_digest(digest: &[u8; 32]) -> Self {
        let mut s = String::with_capacity(66);
        s.push_str("0x");
        for b in digest {
            s.push_str(&format!("{b:02x}"));
        }
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form for log lines.
    pub fn short(&self) -> &str {
        &self.0[..10.min(self.0.len())]
    }
}

// -- StoreId ------------------------------------------------------------------

/// Store identifier. Records are keyed by store but not isolated by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StoreId(String);

impl StoreId {
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyStoreId);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// -- WalletAddress ------------------------------------------------------------

/// EVM-style wallet address, normalized to lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WalletAddress(String);

impl WalletAddress {
    /// Parse and normalize a wallet address.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidWalletAddress`] unless the value is
    /// `0x` followed by exactly 40 hex digits.
    pub fn parse(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        let trimmed = s.trim();
        match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
            Some(body) if is_hex_body(body, 40) => {
                Ok(Self(format!("0x{}", body.to_ascii_lowercase())))
            }
            _ => Err(ValidationError::InvalidWalletAddress(s)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// -- TxRef --------------------------------------------------------------------

/// Reference to a transaction on the append-only ledger, or a locally
/// fabricated `OFFLINE-` placeholder when the ledger write was not observed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TxRef(String);

impl TxRef {
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if s.trim().is_empty() {
            return Err(ValidationError::EmptyTxRef);
        }
        Ok(Self(s))
    }

    /// Transaction hash form of a raw 32-byte digest.
    pub fn from_digest(digest: &[u8; 32]) -> Self {
        Self(OrderHash::from_digest(digest).0)
    }

    /// Fallback reference for a receipt whose chain write failed.
    pub fn offline(receipt: &ReceiptNumber) -> Self {
        Self(format!("{OFFLINE_PREFIX}{}", receipt.as_str()))
    }

    /// True for references fabricated by [`TxRef::offline`].
    pub fn is_offline(&self) -> bool {
        self.0.starts_with(OFFLINE_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// -- Trait plumbing -----------------------------------------------------------

macro_rules! string_newtype_impls {
    ($ty:ident, $ctor:ident) => {
        impl TryFrom<String> for $ty {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::$ctor(value)
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> Self {
                value.0
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::str::FromStr for $ty {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::$ctor(s)
            }
        }
    };
}

string_newtype_impls!(ReceiptNumber, new);
string_newtype_impls!(OrderHash, parse);
string_newtype_impls!(StoreId, new);
string_newtype_impls!(WalletAddress, parse);
string_newtype_impls!(TxRef, new);
