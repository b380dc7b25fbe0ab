//! # Reconciliation Worker
//!
//! Closes the gap between the local ledger and the append-only ledger.
//! Each pass:
//!
//! 1. Re-attempts every chain write a receipt still owes (`chain_sync` not
//!    `synced`), keyed by order hash, and replaces `OFFLINE-` references
//!    with the observed transaction.
//! 2. Queries the chain for every synced PENDING receipt and advances it
//!    to PAID when the chain is ahead.
//! 3. Re-issues the mint for every reward credit whose mint was never
//!    observed, with the same session key.
//!
//! Failures are logged and retried on the next tick.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use scango_chain::ChainError;
use scango_core::{ReceiptStatus, TxRef};
use scango_state::ChainSync;

use crate::orchestration::{apply_chain_view, bounded, persist_logged, sync_to_chain};
use crate::state::AppState;

/// Summary of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub finished_at: Option<DateTime<Utc>>,
    /// Receipts whose owed chain writes all landed this pass.
    pub synced: u64,
    /// Receipts that still owe a chain write.
    pub still_owed: u64,
    /// PENDING receipts advanced because the chain reported them paid.
    pub advanced: u64,
    pub reminted: u64,
    pub remint_failures: u64,
}

impl ReconcileReport {
    fn is_quiet(&self) -> bool {
        self.synced == 0
            && self.still_owed == 0
            && self.advanced == 0
            && self.reminted == 0
            && self.remint_failures == 0
    }
}

/// Run one reconciliation pass and store its report on the state.
pub async fn reconcile_once(state: &AppState) -> ReconcileReport {
    let mut report = ReconcileReport::default();

    sync_owed_writes(state, &mut report).await;
    advance_from_chain(state, &mut report).await;
    remint_rewards(state, &mut report).await;
    state.locks.prune();

    report.finished_at = Some(Utc::now());
    if report.is_quiet() {
        tracing::debug!("reconciliation pass: nothing to do");
    } else {
        tracing::info!(
            synced = report.synced,
            still_owed = report.still_owed,
            advanced = report.advanced,
            reminted = report.reminted,
            remint_failures = report.remint_failures,
            "reconciliation pass complete"
        );
    }
    *state.last_reconcile.lock() = Some(report.clone());
    report
}

async fn sync_owed_writes(state: &AppState, report: &mut ReconcileReport) {
    let owed = state.ledger.scan(&|r| r.needs_chain_sync());
    for candidate in owed {
        let number = candidate.receipt_number;
        let _guard = state.locks.acquire(&number).await;
        // Re-read under the lock; a request may have synced it meanwhile.
        let receipt = match state.ledger.get_by_receipt_number(&number) {
            Ok(r) if r.needs_chain_sync() => r,
            Ok(_) => continue,
            Err(e) => {
                tracing::error!(receipt_number = %number, error = %e, "receipt vanished during reconciliation");
                continue;
            }
        };

        let paid = receipt.status() >= ReceiptStatus::Paid;
        let write = sync_to_chain(state, &receipt.order_hash, receipt.chain_sync, paid).await;
        if write.sync == ChainSync::Synced {
            report.synced += 1;
        } else {
            report.still_owed += 1;
        }
        if write.tx.is_none() && write.sync == receipt.chain_sync {
            continue;
        }

        let tx = write
            .tx
            .or(receipt.chain_tx_ref)
            .unwrap_or_else(|| TxRef::offline(&number));
        match state.ledger.record_chain(&number, tx, write.sync) {
            Ok(updated) => {
                tracing::info!(
                    receipt_number = %number,
                    chain_sync = updated.chain_sync.as_str(),
                    "chain write reconciled"
                );
                persist_logged(state, &updated).await;
            }
            Err(e) => {
                tracing::error!(receipt_number = %number, error = %e, "failed to record reconciled chain write");
            }
        }
    }
}

async fn advance_from_chain(state: &AppState, report: &mut ReconcileReport) {
    let pending = state
        .ledger
        .scan(&|r| r.status() == ReceiptStatus::Pending && !r.needs_chain_sync());
    for receipt in pending {
        let number = receipt.receipt_number.clone();
        let chain = match bounded(
            state.config.chain_deadline,
            "query_status",
            state.chain.query_status(&receipt.order_hash),
        )
        .await
        {
            Ok(chain) => chain,
            Err(e) => {
                tracing::warn!(receipt_number = %number, error = %e, "chain status unavailable during reconciliation");
                continue;
            }
        };
        match apply_chain_view(state, receipt, chain).await {
            Ok(updated) if updated.status() > ReceiptStatus::Pending => report.advanced += 1,
            Ok(_) => {}
            Err(e) => {
                tracing::error!(receipt_number = %number, error = %e, "failed to apply chain status");
            }
        }
    }
}

async fn remint_rewards(state: &AppState, report: &mut ReconcileReport) {
    for credit in state.rewards.unminted() {
        let minted = bounded(state.config.chain_deadline, "mint", async {
            Ok::<_, ChainError>(state.reward_engine.remint(&credit).await)
        })
        .await
        .ok()
        .flatten();
        if minted.is_some() {
            report.reminted += 1;
        } else {
            report.remint_failures += 1;
        }
    }
}

/// Run [`reconcile_once`] every `config.reconcile_interval` until shutdown.
pub fn spawn_reconciler(state: AppState) -> JoinHandle<()> {
    let mut shutdown = state.shutdown_signal();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(state.config.reconcile_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately; skip it so startup is not
        // delayed by a full pass.
        ticker.tick().await;
        tracing::info!(interval = ?state.config.reconcile_interval, "reconciliation worker started");

        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    reconcile_once(&state).await;
                }
            }
        }
        tracing::info!("reconciliation worker stopped");
    })
}
