//! # Reward Account Store
//!
//! One account per wallet, created on first credit. A given order hash
//! credits at most one account, once: the credit entry for the order is
//! claimed before the balance moves, and a second claim for the same order
//! reports [`CreditOutcome::AlreadyCredited`] without touching any balance.
//!
//! Mint status is tracked per credit so the reconciliation worker can find
//! credits whose on-chain mint has not been observed.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use scango_core::{OrderHash, TxRef, WalletAddress};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardAccount {
    pub wallet_address: WalletAddress,
    pub reward_balance: u64,
    pub updated_at: DateTime<Utc>,
}

/// One order's contribution to a reward account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardCredit {
    pub order_hash: OrderHash,
    pub wallet_address: WalletAddress,
    pub amount: u64,
    /// Ledger transaction of the mint, once observed.
    pub mint_tx: Option<TxRef>,
    pub credited_at: DateTime<Utc>,
}

impl RewardCredit {
    pub fn is_minted(&self) -> bool {
        self.mint_tx.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreditOutcome {
    Credited { balance: u64 },
    AlreadyCredited,
}

#[derive(Debug, Default)]
pub struct RewardAccountStore {
    accounts: DashMap<WalletAddress, RewardAccount>,
    credits: DashMap<OrderHash, RewardCredit>,
}

impl RewardAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `amount` to `wallet` for `order_hash`, at most once per order.
    pub fn credit_once(
        &self,
        wallet: &WalletAddress,
        order_hash: &OrderHash,
        amount: u64,
    ) -> CreditOutcome {
        // Lock order: credit shard, then account shard.
        match self.credits.entry(order_hash.clone()) {
            Entry::Occupied(_) => CreditOutcome::AlreadyCredited,
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let mut account = self
                    .accounts
                    .entry(wallet.clone())
                    .or_insert_with(|| RewardAccount {
                        wallet_address: wallet.clone(),
                        reward_balance: 0,
                        updated_at: now,
                    });
                account.reward_balance = account.reward_balance.saturating_add(amount);
                account.updated_at = now;
                let balance = account.reward_balance;
                slot.insert(RewardCredit {
                    order_hash: order_hash.clone(),
                    wallet_address: wallet.clone(),
                    amount,
                    mint_tx: None,
                    credited_at: now,
                });
                CreditOutcome::Credited { balance }
            }
        }
    }

    /// Balance for a wallet; wallets never credited have balance 0.
    pub fn balance(&self, wallet: &WalletAddress) -> u64 {
        self.accounts
            .get(wallet)
            .map(|a| a.reward_balance)
            .unwrap_or(0)
    }

    pub fn account(&self, wallet: &WalletAddress) -> Option<RewardAccount> {
        self.accounts.get(wallet).map(|a| a.value().clone())
    }

    pub fn credit(&self, order_hash: &OrderHash) -> Option<RewardCredit> {
        self.credits.get(order_hash).map(|c| c.value().clone())
    }

    /// Record the ledger transaction for a credit's mint.
    pub fn mark_minted(&self, order_hash: &OrderHash, tx: TxRef) -> Option<RewardCredit> {
        self.credits.get_mut(order_hash).map(|mut c| {
            c.mint_tx = Some(tx);
            c.value().clone()
        })
    }

    /// Credits whose mint has not been observed yet.
    pub fn unminted(&self) -> Vec<RewardCredit> {
        self.credits
            .iter()
            .filter(|c| !c.is_minted())
            .map(|c| c.value().clone())
            .collect()
    }

    /// Reinstate persisted state on startup. Does not re-apply balances.
    pub fn restore(&self, accounts: Vec<RewardAccount>, credits: Vec<RewardCredit>) {
        for account in accounts {
            self.accounts.insert(account.wallet_address.clone(), account);
        }
        for credit in credits {
            self.credits.insert(credit.order_hash.clone(), credit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn wallet() -> WalletAddress {
        WalletAddress::parse("0x00000000000000000000000000000000000000aa").unwrap()
    }

    #[test]
    fn first_credit_creates_account() {
        let store = RewardAccountStore::new();
        assert_eq!(store.balance(&wallet()), 0);
        let out = store.credit_once(&wallet(), &OrderHash::from_digest(&[1; 32]), 5);
        assert_eq!(out, CreditOutcome::Credited { balance: 5 });
        assert_eq!(store.balance(&wallet()), 5);
    }

    #[test]
    fn same_order_credits_once() {
        let store = RewardAccountStore::new();
        let order = OrderHash::from_digest(&[1; 32]);
        store.credit_once(&wallet(), &order, 11);
        assert_eq!(
            store.credit_once(&wallet(), &order, 11),
            CreditOutcome::AlreadyCredited
        );
        assert_eq!(store.balance(&wallet()), 11);
    }

    #[test]
    fn distinct_orders_accumulate() {
        let store = RewardAccountStore::new();
        store.credit_once(&wallet(), &OrderHash::from_digest(&[1; 32]), 5);
        let out = store.credit_once(&wallet(), &OrderHash::from_digest(&[2; 32]), 6);
        assert_eq!(out, CreditOutcome::Credited { balance: 11 });
    }

    #[test]
    fn mint_tracking() {
        let store = RewardAccountStore::new();
        let order = OrderHash::from_digest(&[3; 32]);
        store.credit_once(&wallet(), &order, 4);
        assert_eq!(store.unminted().len(), 1);
        let credit = store.mark_minted(&order, TxRef::new("0xmint").unwrap()).unwrap();
        assert!(credit.is_minted());
        assert!(store.unminted().is_empty());
        assert!(store
            .mark_minted(&OrderHash::from_digest(&[9; 32]), TxRef::new("0x").unwrap())
            .is_none());
    }

    #[test]
    fn racing_duplicates_credit_exactly_once() {
        let store = Arc::new(RewardAccountStore::new());
        let order = OrderHash::from_digest(&[7; 32]);
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                let order = order.clone();
                std::thread::spawn(move || store.credit_once(&wallet(), &order, 3))
            })
            .collect();
        let credited = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|o| matches!(o, CreditOutcome::Credited { .. }))
            .count();
        assert_eq!(credited, 1);
        assert_eq!(store.balance(&wallet()), 3);
    }

    #[test]
    fn restore_does_not_double_apply() {
        let store = RewardAccountStore::new();
        let order = OrderHash::from_digest(&[5; 32]);
        store.credit_once(&wallet(), &order, 8);
        let account = store.account(&wallet()).unwrap();
        let credit = store.credit(&order).unwrap();

        let fresh = RewardAccountStore::new();
        fresh.restore(vec![account], vec![credit]);
        assert_eq!(fresh.balance(&wallet()), 8);
        assert_eq!(
            fresh.credit_once(&wallet(), &order, 8),
            CreditOutcome::AlreadyCredited
        );
    }
}
