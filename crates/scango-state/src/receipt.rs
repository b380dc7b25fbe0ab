//! # Receipt Record
//!
//! One receipt per checkout attempt. Status is a strict total order
//! `Pending < Paid < Verified`:
//!
//! - a target above the current status advances and is logged;
//! - a target equal to the current status is a no-op (retry safety);
//! - a target below the current status is rejected and nothing changes.
//!
//! Receipts are never deleted. Once VERIFIED the record is an audit artifact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use scango_core::{
    item_count, LineItem, OrderHash, PaymentMethod, ReceiptNumber, ReceiptStatus, StoreId, TxRef,
    WalletAddress,
};

/// Who caused a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Actor {
    Checkout,
    Cashier,
    Guard,
    /// Reconciliation against the append-only ledger.
    Chain,
}

/// How far the external ledger has caught up with this receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChainSync {
    /// Every write this receipt needs has been observed on the ledger.
    Synced,
    /// `record_order` has not been observed yet.
    OrderPending,
    /// The order is recorded but `confirm_payment` is still owed.
    PaymentPending,
}

impl ChainSync {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Synced => "synced",
            Self::OrderPending => "orderPending",
            Self::PaymentPending => "paymentPending",
        }
    }
}

/// One entry in a receipt's transition log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRecord {
    /// `None` for the creation entry.
    pub from: Option<ReceiptStatus>,
    pub to: ReceiptStatus,
    pub actor: Actor,
    pub at: DateTime<Utc>,
}

/// Result of a successful transition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Advanced {
        from: ReceiptStatus,
        to: ReceiptStatus,
    },
    /// Target equalled the current status; nothing was written.
    Unchanged,
}

impl TransitionOutcome {
    pub fn advanced(&self) -> bool {
        matches!(self, Self::Advanced { .. })
    }
}

/// Errors from the receipt state machine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// The target status does not exceed the current one.
    #[error("invalid receipt transition: {from} -> {to}")]
    InvalidTransition {
        from: ReceiptStatus,
        to: ReceiptStatus,
    },
}

/// Checkout inputs for a new receipt. All fields are already validated.
#[derive(Debug, Clone)]
pub struct NewReceipt {
    pub receipt_number: ReceiptNumber,
    pub order_hash: OrderHash,
    pub store_id: StoreId,
    pub total_amount: f64,
    pub items: Vec<LineItem>,
    pub payment_method: PaymentMethod,
    pub wallet_address: Option<WalletAddress>,
    pub time_spent_minutes: f64,
}

/// The durable receipt record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub receipt_number: ReceiptNumber,
    pub order_hash: OrderHash,
    pub store_id: StoreId,
    pub total_amount: f64,
    pub items: Vec<LineItem>,
    pub payment_method: PaymentMethod,
    status: ReceiptStatus,
    pub chain_tx_ref: Option<TxRef>,
    pub chain_sync: ChainSync,
    pub wallet_address: Option<WalletAddress>,
    pub time_spent_minutes: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub transitions: Vec<TransitionRecord>,
}

impl Receipt {
    /// Create a receipt in its initial status: PENDING for cash, PAID for
    /// every other method.
    pub fn new(draft: NewReceipt) -> Self {
        let now = Utc::now();
        let status = ReceiptStatus::initial_for(draft.payment_method);
        Self {
            receipt_number: draft.receipt_number,
            order_hash: draft.order_hash,
            store_id: draft.store_id,
            total_amount: draft.total_amount,
            items: draft.items,
            payment_method: draft.payment_method,
            status,
            chain_tx_ref: None,
            chain_sync: ChainSync::OrderPending,
            wallet_address: draft.wallet_address,
            time_spent_minutes: draft.time_spent_minutes,
            created_at: now,
            updated_at: now,
            transitions: vec![TransitionRecord {
                from: None,
                to: status,
                actor: Actor::Checkout,
                at: now,
            }],
        }
    }

    pub fn status(&self) -> ReceiptStatus {
        self.status
    }

    pub fn item_count(&self) -> u32 {
        item_count(&self.items)
    }

    /// Request a status change.
    pub fn transition(
        &mut self,
        to: ReceiptStatus,
        actor: Actor,
    ) -> Result<TransitionOutcome, TransitionError> {
        let from = self.status;
        if to == from {
            return Ok(TransitionOutcome::Unchanged);
        }
        if to < from {
            return Err(TransitionError::InvalidTransition { from, to });
        }
        let now = Utc::now();
        self.transitions.push(TransitionRecord {
            from: Some(from),
            to,
            actor,
            at: now,
        });
        self.status = to;
        self.updated_at = now;
        Ok(TransitionOutcome::Advanced { from, to })
    }

    /// Record the outcome of a chain write.
    pub fn record_chain(&mut self, tx: TxRef, sync: ChainSync) {
        self.chain_tx_ref = Some(tx);
        self.chain_sync = sync;
        self.updated_at = Utc::now();
    }

    /// True while the reconciliation worker still owes this receipt a
    /// ledger write.
    pub fn needs_chain_sync(&self) -> bool {
        self.chain_sync != ChainSync::Synced
    }
}
