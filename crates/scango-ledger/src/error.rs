use thiserror::Error;

use scango_core::{OrderHash, ReceiptNumber};
use scango_state::TransitionError;

/// Errors from the receipt ledger.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// A receipt with this number already exists.
    #[error("duplicate receipt: {0}")]
    DuplicateReceipt(ReceiptNumber),

    /// A receipt with this order hash already exists.
    #[error("duplicate order hash: {0}")]
    DuplicateOrderHash(OrderHash),

    /// No receipt matches the key.
    #[error("receipt not found: {0}")]
    NotFound(String),

    /// The requested status change would move the receipt backwards.
    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),
}
