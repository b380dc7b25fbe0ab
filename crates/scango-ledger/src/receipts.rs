//! # Receipt Ledger
//!
//! `ReceiptLedger` is the storage seam. `MemoryReceiptLedger` is the
//! in-process implementation; the API layer writes through to Postgres after
//! each successful mutation and hydrates this store on startup.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use scango_core::{OrderHash, ReceiptNumber, ReceiptStatus, TxRef};
use scango_state::{Actor, ChainSync, Receipt, TransitionOutcome};

use crate::error::LedgerError;

/// Local receipt store keyed by receipt number, with an order-hash index.
///
/// All methods are synchronous: implementations never hold a lock across an
/// `.await`.
pub trait ReceiptLedger: Send + Sync {
    /// Insert a new receipt.
    ///
    /// # Errors
    ///
    /// [`LedgerError::DuplicateReceipt`] if the receipt number exists, or
    /// [`LedgerError::DuplicateOrderHash`] if the order hash exists.
    fn insert(&self, receipt: Receipt) -> Result<(), LedgerError>;

    /// Current record for a receipt number.
    fn get_by_receipt_number(&self, number: &ReceiptNumber) -> Result<Receipt, LedgerError>;

    /// Current record for an order hash.
    fn get_by_order_hash(&self, hash: &OrderHash) -> Result<Receipt, LedgerError>;

    /// Move a receipt forward. Equal status is a no-op; lower status is
    /// [`LedgerError::InvalidTransition`] and leaves the record unchanged.
    fn transition_status(
        &self,
        number: &ReceiptNumber,
        to: ReceiptStatus,
        actor: Actor,
    ) -> Result<(Receipt, TransitionOutcome), LedgerError>;

    /// Store the latest chain reference and sync state.
    fn record_chain(
        &self,
        number: &ReceiptNumber,
        tx: TxRef,
        sync: ChainSync,
    ) -> Result<Receipt, LedgerError>;

    /// Drop a receipt and its order-hash index entry. Used to undo an
    /// insert whose durable write failed.
    fn remove(&self, number: &ReceiptNumber) -> Result<Receipt, LedgerError>;

    /// Snapshot of every receipt matching `filter`.
    fn scan(&self, filter: &dyn Fn(&Receipt) -> bool) -> Vec<Receipt>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `DashMap`-backed [`ReceiptLedger`].
#[derive(Debug, Default)]
pub struct MemoryReceiptLedger {
    receipts: DashMap<ReceiptNumber, Receipt>,
    by_order_hash: DashMap<OrderHash, ReceiptNumber>,
}

impl MemoryReceiptLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn update<R>(
        &self,
        number: &ReceiptNumber,
        f: impl FnOnce(&mut Receipt) -> Result<R, LedgerError>,
    ) -> Result<R, LedgerError> {
        let mut entry = self
            .receipts
            .get_mut(number)
            .ok_or_else(|| LedgerError::NotFound(number.to_string()))?;
        f(entry.value_mut())
    }
}

impl ReceiptLedger for MemoryReceiptLedger {
    fn insert(&self, receipt: Receipt) -> Result<(), LedgerError> {
        // Lock order: receipt shard, then order-hash shard.
        match self.receipts.entry(receipt.receipt_number.clone()) {
            Entry::Occupied(_) => {
                tracing::debug!(receipt_number = %receipt.receipt_number, "receipt number taken");
                Err(LedgerError::DuplicateReceipt(receipt.receipt_number))
            }
            Entry::Vacant(slot) => match self.by_order_hash.entry(receipt.order_hash.clone()) {
                Entry::Occupied(existing) => {
                    tracing::warn!(
                        order_hash = %receipt.order_hash,
                        existing = %existing.get(),
                        "order hash already has a receipt"
                    );
                    Err(LedgerError::DuplicateOrderHash(receipt.order_hash))
                }
                Entry::Vacant(hash_slot) => {
                    hash_slot.insert(receipt.receipt_number.clone());
                    slot.insert(receipt);
                    Ok(())
                }
            },
        }
    }

    fn get_by_receipt_number(&self, number: &ReceiptNumber) -> Result<Receipt, LedgerError> {
        self.receipts
            .get(number)
            .map(|r| r.value().clone())
            .ok_or_else(|| LedgerError::NotFound(number.to_string()))
    }

    fn get_by_order_hash(&self, hash: &OrderHash) -> Result<Receipt, LedgerError> {
        let number = self
            .by_order_hash
            .get(hash)
            .map(|n| n.value().clone())
            .ok_or_else(|| LedgerError::NotFound(hash.to_string()))?;
        self.get_by_receipt_number(&number)
    }

    fn transition_status(
        &self,
        number: &ReceiptNumber,
        to: ReceiptStatus,
        actor: Actor,
    ) -> Result<(Receipt, TransitionOutcome), LedgerError> {
        self.update(number, |receipt| {
            let outcome = receipt.transition(to, actor)?;
            Ok((receipt.clone(), outcome))
        })
    }

    fn record_chain(
        &self,
        number: &ReceiptNumber,
        tx: TxRef,
        sync: ChainSync,
    ) -> Result<Receipt, LedgerError> {
        self.update(number, |receipt| {
            receipt.record_chain(tx, sync);
            Ok(receipt.clone())
        })
    }

    fn remove(&self, number: &ReceiptNumber) -> Result<Receipt, LedgerError> {
        let (_, receipt) = self
            .receipts
            .remove(number)
            .ok_or_else(|| LedgerError::NotFound(number.to_string()))?;
        self.by_order_hash
            .remove_if(&receipt.order_hash, |_, owner| owner == number);
        tracing::info!(receipt_number = %number, order_hash = %receipt.order_hash, "receipt removed");
        Ok(receipt)
    }

    fn scan(&self, filter: &dyn Fn(&Receipt) -> bool) -> Vec<Receipt> {
        self.receipts
            .iter()
            .filter(|r| filter(r.value()))
            .map(|r| r.value().clone())
            .collect()
    }

    fn len(&self) -> usize {
        self.receipts.len()
    }
}
