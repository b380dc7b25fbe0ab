//! # Per-Receipt Action Locks
//!
//! Cashier and guard actions read a receipt, await the chain, then write.
//! Holding a receipt's lock across that sequence makes the two actions
//! mutually exclusive on the same receipt, while actions on other receipts
//! take other locks and never wait on each other.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use scango_core::ReceiptNumber;

/// Lazily created async mutex per receipt number.
#[derive(Debug, Default, Clone)]
pub struct ReceiptLocks {
    inner: Arc<DashMap<ReceiptNumber, Arc<Mutex<()>>>>,
}

impl ReceiptLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `number`. The lock is released when the
    /// returned guard drops.
    pub async fn acquire(&self, number: &ReceiptNumber) -> OwnedMutexGuard<()> {
        // Clone the mutex out so the shard lock is released before awaiting.
        let mutex = Arc::clone(
            self.inner
                .entry(number.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        );
        mutex.lock_owned().await
    }

    /// Drop lock entries nobody is holding or waiting on.
    pub fn prune(&self) {
        let before = self.inner.len();
        self.inner.retain(|_, m| Arc::strong_count(m) > 1);
        let pruned = before.saturating_sub(self.inner.len());
        if pruned > 0 {
            tracing::debug!(pruned, remaining = self.inner.len(), "idle receipt locks pruned");
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn n(s: &str) -> ReceiptNumber {
        ReceiptNumber::new(s).unwrap()
    }

    #[tokio::test]
    async fn same_receipt_serializes() {
        let locks = ReceiptLocks::new();
        let guard = locks.acquire(&n("RCP-000001")).await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _g = locks.acquire(&n("RCP-000001")).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn different_receipts_do_not_block() {
        let locks = ReceiptLocks::new();
        let _a = locks.acquire(&n("RCP-000001")).await;
        let b = tokio::time::timeout(Duration::from_millis(200), locks.acquire(&n("RCP-000002")))
            .await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn prune_keeps_held_locks() {
        let locks = ReceiptLocks::new();
        let held = locks.acquire(&n("RCP-000001")).await;
        drop(locks.acquire(&n("RCP-000002")).await);
        locks.prune();
        assert_eq!(locks.len(), 1);
        drop(held);
        locks.prune();
        assert!(locks.is_empty());
    }
}
