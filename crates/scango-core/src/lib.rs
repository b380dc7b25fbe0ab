//! # scango-core — Foundational Types for ScanGo
//!
//! Every other crate in the workspace depends on `scango-core`; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Validated newtypes for identifiers.** `ReceiptNumber`, `OrderHash`,
//!    `StoreId`, `WalletAddress`, `TxRef`. Parsing from untrusted input goes
//!    through `new()`/`parse()`, and serde deserialization runs the same
//!    validation.
//!
//! 2. **Ordered receipt status.** `ReceiptStatus` derives `Ord` so that
//!    `Pending < Paid < Verified` is a single comparison everywhere.
//!
//! 3. **Opaque order identity.** `OrderHash` values are only minted by
//!    [`hash::generate_order_hash`], which mixes a 16-byte OS nonce into the
//!    hashed payload.
//!
//! 4. **Strict proof decoding.** [`proof::ExitProof::decode`] rejects any
//!    payload that is not an object with exactly three string fields.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `scango-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod hash;
pub mod identity;
pub mod order;
pub mod proof;

pub use error::{EntropyError, OrderHashError, ProofDecodeError, ValidationError};
pub use hash::{generate_order_hash, order_hash_with};
pub use identity::{OrderHash, ReceiptNumber, StoreId, TxRef, WalletAddress};
pub use order::{item_count, validate_cart, ChainOrderStatus, LineItem, PaymentMethod, ReceiptStatus};
pub use proof::ExitProof;
