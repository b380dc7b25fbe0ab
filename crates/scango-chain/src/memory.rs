//! In-process ledger for development and tests.
//!
//! Simulates the append-only ledger with deterministic transaction hashes
//! derived from the operation, order hash, and a monotonically increasing
//! block counter. An outage switch makes every call fail with
//! [`ChainError::Unavailable`] so callers' fallback paths can be exercised.
//!
//! This implementation provides no durability or finality guarantees.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use sha2::{Digest, Sha256};

use scango_core::{ChainOrderStatus, OrderHash, TxRef, WalletAddress};

use crate::error::ChainError;
use crate::mint::MintRequest;
use crate::wire::OrderView;
use crate::{ChainMirror, RewardMinter};

fn pseudo_tx(op: &str, key: &str, block: u64) -> TxRef {
    let digest: [u8; 32] = Sha256::digest(format!("{op}:{key}:{block}").as_bytes()).into();
    TxRef::from_digest(&digest)
}

#[derive(Debug, Clone)]
struct OrderEntry {
    status: ChainOrderStatus,
    created_tx: TxRef,
    paid_tx: Option<TxRef>,
}

// -- MemoryChainMirror --------------------------------------------------------

#[derive(Debug)]
pub struct MemoryChainMirror {
    orders: DashMap<OrderHash, OrderEntry>,
    next_block: AtomicU64,
    online: AtomicBool,
    calls: AtomicU64,
}

impl Default for MemoryChainMirror {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryChainMirror {
    pub fn new() -> Self {
        Self {
            orders: DashMap::new(),
            next_block: AtomicU64::new(1),
            online: AtomicBool::new(true),
            calls: AtomicU64::new(0),
        }
    }

    /// Toggle the simulated outage.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Number of calls received, including failed ones.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Current ledger entry for an order.
    pub fn order(&self, order_hash: &OrderHash) -> Option<OrderView> {
        self.orders.get(order_hash).map(|e| OrderView {
            order_hash: order_hash.clone(),
            status: e.status,
            tx_hash: Some(e.paid_tx.clone().unwrap_or_else(|| e.created_tx.clone())),
        })
    }

    fn admit(&self, endpoint: &str) -> Result<u64, ChainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.online.load(Ordering::SeqCst) {
            return Err(ChainError::Unavailable(format!("{endpoint}: simulated outage")));
        }
        Ok(self.next_block.fetch_add(1, Ordering::SeqCst))
    }
}

#[async_trait]
impl ChainMirror for MemoryChainMirror {
    async fn record_order(&self, order_hash: &OrderHash) -> Result<TxRef, ChainError> {
        let block = self.admit("record_order")?;
        let entry = self
            .orders
            .entry(order_hash.clone())
            .or_insert_with(|| OrderEntry {
                status: ChainOrderStatus::Created,
                created_tx: pseudo_tx("record", order_hash.as_str(), block),
                paid_tx: None,
            });
        Ok(entry.created_tx.clone())
    }

    async fn confirm_payment(&self, order_hash: &OrderHash) -> Result<TxRef, ChainError> {
        let block = self.admit("confirm_payment")?;
        let mut entry = self
            .orders
            .get_mut(order_hash)
            .ok_or_else(|| ChainError::Rejected {
                endpoint: "confirm_payment".into(),
                reason: format!("order {order_hash} is not recorded"),
            })?;
        if let Some(tx) = &entry.paid_tx {
            return Ok(tx.clone());
        }
        let tx = pseudo_tx("pay", order_hash.as_str(), block);
        entry.status = ChainOrderStatus::Paid;
        entry.paid_tx = Some(tx.clone());
        Ok(tx)
    }

    async fn query_status(&self, order_hash: &OrderHash) -> Result<ChainOrderStatus, ChainError> {
        self.admit("query_status")?;
        Ok(self
            .orders
            .get(order_hash)
            .map_or(ChainOrderStatus::Unknown, |e| e.status))
    }
}

// -- MemoryRewardMinter -------------------------------------------------------

#[derive(Debug)]
pub struct MemoryRewardMinter {
    mints: DashMap<OrderHash, (MintRequest, TxRef)>,
    balances: DashMap<WalletAddress, u64>,
    next_block: AtomicU64,
    online: AtomicBool,
    attempts: AtomicU64,
}

impl Default for MemoryRewardMinter {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRewardMinter {
    pub fn new() -> Self {
        Self {
            mints: DashMap::new(),
            balances: DashMap::new(),
            next_block: AtomicU64::new(1),
            online: AtomicBool::new(true),
            attempts: AtomicU64::new(0),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Mint calls received, including replays and failures.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Distinct sessions minted.
    pub fn minted_sessions(&self) -> usize {
        self.mints.len()
    }
}

#[async_trait]
impl RewardMinter for MemoryRewardMinter {
    async fn mint(&self, req: &MintRequest) -> Result<TxRef, ChainError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if !self.online.load(Ordering::SeqCst) {
            return Err(ChainError::Unavailable("mint: simulated outage".into()));
        }
        let block = self.next_block.fetch_add(1, Ordering::SeqCst);
        let mut fresh = false;
        let tx = self
            .mints
            .entry(req.session_id().clone())
            .or_insert_with(|| {
                fresh = true;
                (
                    req.clone(),
                    pseudo_tx("mint", req.session_id().as_str(), block),
                )
            })
            .1
            .clone();
        if fresh {
            *self.balances.entry(req.wallet().clone()).or_insert(0) += req.amount();
        }
        Ok(tx)
    }

    async fn balance_of(&self, wallet: &WalletAddress) -> Result<u64, ChainError> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(ChainError::Unavailable("balance_of: simulated outage".into()));
        }
        Ok(self.balances.get(wallet).map_or(0, |b| *b))
    }
}
