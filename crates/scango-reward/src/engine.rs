//! # Reward Engine
//!
//! Turns one checked-out order into at most one local credit and one mint.
//!
//! ## Pipeline
//!
//! 1. Compute entitlement. Zero ends the pipeline.
//! 2. Build the [`MintRequest`]. The wallet arrives as the shopper typed it
//!    and is validated here, so a malformed address only costs the reward.
//! 3. Claim the credit for the order hash. A second claim for the same
//!    order stops here, so a replayed checkout never mints twice.
//! 4. Mint against the reward ledger with the order hash as session key.
//! 5. Record the mint transaction, or leave the credit unminted for the
//!    reconciliation pass.
//!
//! The local balance moves in step 3, before the mint. A failed mint leaves
//! the local balance ahead of the chain until reconciliation re-mints.

use std::sync::Arc;

use async_trait::async_trait;
use prometheus::{IntCounter, Registry};

use scango_chain::{MintRequest, RewardMinter};
use scango_core::{OrderHash, TxRef, ValidationError, WalletAddress};
use scango_ledger::{CreditOutcome, RewardAccount, RewardAccountStore, RewardCredit};

use crate::compute::compute_reward;

/// One order's reward work item.
#[derive(Debug, Clone, PartialEq)]
pub struct RewardJob {
    pub order_hash: OrderHash,
    /// Unvalidated wallet address from the checkout body.
    pub wallet: String,
    pub total: f64,
    /// Dwell time in minutes.
    pub time_spent: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RewardOutcome {
    /// Entitlement was zero; nothing recorded.
    NoReward,
    /// Mint request failed local validation.
    Rejected(ValidationError),
    /// This order was already credited.
    AlreadyCredited,
    /// Local balance credited; `mint_tx` is set when the mint was observed.
    Credited {
        amount: u64,
        balance: u64,
        mint_tx: Option<TxRef>,
    },
}

/// Durable record of reward state changes.
///
/// Called after the in-memory store has changed. Implementations log their
/// own failures; the in-memory state is never rolled back.
#[async_trait]
pub trait RewardJournal: Send + Sync {
    async fn record(&self, account: &RewardAccount, credit: &RewardCredit);
}

/// Reward pipeline counters. Clones share the counters; [`register`]
/// exposes them through a service registry.
///
/// [`register`]: RewardStats::register
#[derive(Clone)]
pub struct RewardStats {
    credited: IntCounter,
    duplicates: IntCounter,
    rejected: IntCounter,
    mint_failures: IntCounter,
}

impl std::fmt::Debug for RewardStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RewardStats")
            .field("credited", &self.credited())
            .field("duplicates", &self.duplicates())
            .field("rejected", &self.rejected())
            .field("mint_failures", &self.mint_failures())
            .finish()
    }
}

fn counter(name: &str, help: &str) -> IntCounter {
    IntCounter::new(name, help).expect("metric can be created")
}

impl Default for RewardStats {
    fn default() -> Self {
        Self {
            credited: counter("scango_rewards_credited_total", "Orders credited with a reward"),
            duplicates: counter(
                "scango_rewards_duplicate_total",
                "Reward jobs skipped because the order was already credited",
            ),
            rejected: counter(
                "scango_rewards_rejected_total",
                "Reward jobs refused because the mint request was invalid",
            ),
            mint_failures: counter("scango_rewards_mint_failures_total", "Reward mints that failed"),
        }
    }
}

impl RewardStats {
    pub fn register(&self, registry: &Registry) -> prometheus::Result<()> {
        for c in [&self.credited, &self.duplicates, &self.rejected, &self.mint_failures] {
            registry.register(Box::new(c.clone()))?;
        }
        Ok(())
    }

    pub fn credited(&self) -> u64 {
        self.credited.get()
    }

    pub fn duplicates(&self) -> u64 {
        self.duplicates.get()
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.get()
    }

    pub fn mint_failures(&self) -> u64 {
        self.mint_failures.get()
    }
}

pub struct RewardEngine {
    accounts: Arc<RewardAccountStore>,
    minter: Arc<dyn RewardMinter>,
    journal: Option<Arc<dyn RewardJournal>>,
    stats: RewardStats,
}

impl std::fmt::Debug for RewardEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RewardEngine")
            .field("journal", &self.journal.is_some())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl RewardEngine {
    pub fn new(accounts: Arc<RewardAccountStore>, minter: Arc<dyn RewardMinter>) -> Self {
        Self {
            accounts,
            minter,
            journal: None,
            stats: RewardStats::default(),
        }
    }

    pub fn with_journal(mut self, journal: Arc<dyn RewardJournal>) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn accounts(&self) -> &Arc<RewardAccountStore> {
        &self.accounts
    }

    pub fn stats(&self) -> &RewardStats {
        &self.stats
    }

    pub async fn process(&self, job: RewardJob) -> RewardOutcome {
        let amount = compute_reward(job.total, job.time_spent);
        if amount == 0 {
            tracing::debug!(order_hash = %job.order_hash, "order earns no reward");
            return RewardOutcome::NoReward;
        }

        let request = match MintRequest::new(job.wallet.as_str(), amount, &job.order_hash) {
            Ok(r) => r,
            Err(e) => {
                self.stats.rejected.inc();
                tracing::warn!(order_hash = %job.order_hash, error = %e, "reward rejected");
                return RewardOutcome::Rejected(e);
            }
        };

        let balance = match self
            .accounts
            .credit_once(request.wallet(), &job.order_hash, amount)
        {
            CreditOutcome::AlreadyCredited => {
                self.stats.duplicates.inc();
                tracing::info!(
                    order_hash = %job.order_hash,
                    "reward already credited for order, skipping"
                );
                return RewardOutcome::AlreadyCredited;
            }
            CreditOutcome::Credited { balance } => balance,
        };
        self.stats.credited.inc();
        tracing::info!(
            order_hash = %job.order_hash,
            wallet = %request.wallet(),
            amount,
            balance,
            "reward credited"
        );
        self.journal_entry(request.wallet(), &job.order_hash).await;

        let mint_tx = self.mint(&request).await;
        RewardOutcome::Credited {
            amount,
            balance,
            mint_tx,
        }
    }

    /// Re-issue the mint for a credit whose mint was never observed.
    /// Returns the transaction when the mint succeeds.
    pub async fn remint(&self, credit: &RewardCredit) -> Option<TxRef> {
        if credit.is_minted() {
            return credit.mint_tx.clone();
        }
        let request = match MintRequest::new(
            credit.wallet_address.as_str(),
            credit.amount,
            &credit.order_hash,
        ) {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(
                    order_hash = %credit.order_hash,
                    error = %e,
                    "stored credit is not mintable"
                );
                return None;
            }
        };
        self.mint(&request).await
    }

    async fn mint(&self, request: &MintRequest) -> Option<TxRef> {
        match self.minter.mint(request).await {
            Ok(tx) => {
                self.accounts.mark_minted(request.session_id(), tx.clone());
                tracing::info!(
                    order_hash = %request.session_id(),
                    tx = %tx,
                    "reward minted"
                );
                self.journal_entry(request.wallet(), request.session_id()).await;
                Some(tx)
            }
            Err(e) => {
                self.stats.mint_failures.inc();
                tracing::warn!(
                    order_hash = %request.session_id(),
                    error = %e,
                    "reward mint failed, local balance ahead of ledger until reconciled"
                );
                None
            }
        }
    }

    async fn journal_entry(&self, wallet: &WalletAddress, order_hash: &OrderHash) {
        let Some(journal) = &self.journal else {
            return;
        };
        if let (Some(account), Some(credit)) =
            (self.accounts.account(wallet), self.accounts.credit(order_hash))
        {
            journal.record(&account, &credit).await;
        }
    }
}
