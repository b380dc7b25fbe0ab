//! # scango-state — Receipt Lifecycle
//!
//! - **Receipt** (`receipt.rs`): the durable record of one checkout and its
//!   monotonic `PENDING → PAID → VERIFIED` status, with an append-only
//!   transition log.
//!
//! - **Lifecycle rules** (`lifecycle.rs`): pure decision functions for the
//!   cashier and guard actions and the chain tie-break. They never perform
//!   I/O; callers fetch the inputs (local record, chain status) and apply the
//!   outcome through the ledger.

pub mod lifecycle;
pub mod receipt;

pub use lifecycle::{
    cashier_decision, chain_advance, guard_decision, CashierDecision, ExitDenied, ExitStatus,
};
pub use receipt::{
    Actor, ChainSync, NewReceipt, Receipt, TransitionError, TransitionOutcome, TransitionRecord,
};
