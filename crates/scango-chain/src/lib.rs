//! # scango-chain — Chain Mirror Client
//!
//! Thin protocol client for the append-only ledger that is authoritative
//! for ScanGo payment facts. Two seams:
//!
//! - [`ChainMirror`]: `record_order`, `confirm_payment`, `query_status`,
//!   each keyed by order hash and idempotent on the ledger side.
//! - [`RewardMinter`]: loyalty-token mints keyed by order hash as the
//!   session (idempotency) key.
//!
//! ## Implementations
//!
//! | Type | Backing |
//! |------|---------|
//! | [`HttpChainMirror`], [`HttpRewardMinter`] | Ledger gateway REST API via `reqwest` |
//! | [`MemoryChainMirror`], [`MemoryRewardMinter`] | In-process maps with a simulated outage switch |
//!
//! ## Network Policy
//!
//! Every HTTP call retries transport failures and 502/503/504 with
//! exponential backoff (3 attempts, 200 ms base) and the whole operation is
//! capped by `call_deadline`. Nothing here retries indefinitely.
//!
//! ## Gateway Paths
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | POST | `/v1/orders` | Record order |
//! | POST | `/v1/orders/{orderHash}/payment` | Confirm payment |
//! | GET  | `/v1/orders/{orderHash}` | Query status (404 ⇒ unknown) |
//! | POST | `/v1/rewards/mint` | Mint reward |
//! | GET  | `/v1/rewards/{wallet}` | On-ledger reward balance |

pub mod config;
pub mod error;
pub mod http;
pub mod memory;
pub mod mint;
pub(crate) mod retry;
pub mod wire;

pub use config::{ChainConfig, ConfigError, RetryPolicy};
pub use error::ChainError;
pub use http::{GatewayClient, HttpChainMirror, HttpRewardMinter};
pub use memory::{MemoryChainMirror, MemoryRewardMinter};
pub use mint::MintRequest;

use async_trait::async_trait;
use scango_core::{ChainOrderStatus, OrderHash, TxRef, WalletAddress};

/// Order and payment facts on the append-only ledger.
#[async_trait]
pub trait ChainMirror: Send + Sync {
    /// Record that an order exists. Returns the recording transaction.
    async fn record_order(&self, order_hash: &OrderHash) -> Result<TxRef, ChainError>;

    /// Record that an order is paid. The order must already be recorded.
    async fn confirm_payment(&self, order_hash: &OrderHash) -> Result<TxRef, ChainError>;

    /// The ledger's view of an order.
    async fn query_status(&self, order_hash: &OrderHash) -> Result<ChainOrderStatus, ChainError>;
}

/// Loyalty-token issuance on the reward ledger.
#[async_trait]
pub trait RewardMinter: Send + Sync {
    /// Mint `req.amount` to `req.wallet`. Replaying a session returns the
    /// original transaction without minting again.
    async fn mint(&self, req: &MintRequest) -> Result<TxRef, ChainError>;

    /// On-ledger balance for a wallet.
    async fn balance_of(&self, wallet: &WalletAddress) -> Result<u64, ChainError>;
}
