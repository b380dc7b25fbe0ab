//! # scango-ledger — Local Systems of Record
//!
//! The fast local side of the dual-ledger protocol. The append-only chain
//! ledger is authoritative for payment facts; this crate is the cache the
//! checkout path writes first and the reconciliation worker brings in line.
//!
//! ## Concurrency
//!
//! Both stores shard their maps with `DashMap`, so a mutation locks only the
//! shard holding its key and operations on different receipts (or wallets)
//! proceed in parallel. Each mutation is a single read-validate-write under
//! the shard lock, which makes it linearizable per key.
//!
//! Multi-step actions that await the network between reading and writing a
//! receipt (cashier mark-paid, guard verify-exit) additionally hold the
//! receipt's entry in [`ReceiptLocks`] for their whole duration.

pub mod error;
pub mod locks;
pub mod receipts;
pub mod rewards;

pub use error::LedgerError;
pub use locks::ReceiptLocks;
pub use receipts::{MemoryReceiptLedger, ReceiptLedger};
pub use rewards::{CreditOutcome, RewardAccount, RewardAccountStore, RewardCredit};
