//! # Order-to-Exit Orchestration
//!
//! The request flows behind the HTTP handlers. Each flow validates first,
//! then mutates the local ledger, then talks to the append-only ledger
//! under a deadline, then writes through to Postgres.
//!
//! ## Flows
//!
//! | Flow | Lock | Chain calls | Chain failure |
//! |------|------|-------------|---------------|
//! | [`checkout`] | new receipt | record, confirm (non-cash) | `OFFLINE-` reference, owed write |
//! | [`mark_paid`] | receipt | record (if owed), confirm | owed write, PAID anyway |
//! | [`verify_exit`] | receipt | query (PAID only) | `PAYMENT_PENDING` |
//! | [`receipt_status`] | receipt (on advance) | query (PENDING only) | local view |
//!
//! Chain writes the ledger still owes are recorded in the receipt's
//! `chain_sync` state and retried by [`crate::reconcile`].

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use scango_chain::ChainError;
use scango_core::{
    generate_order_hash, validate_cart, ChainOrderStatus, ExitProof, LineItem, OrderHash,
    PaymentMethod, ReceiptNumber, ReceiptStatus, StoreId, TxRef, WalletAddress,
};
use scango_ledger::LedgerError;
use scango_reward::RewardJob;
use scango_state::{
    cashier_decision, chain_advance, guard_decision, Actor, CashierDecision, ChainSync,
    ExitStatus, NewReceipt, Receipt,
};

use crate::error::AppError;
use crate::state::AppState;

/// Receipt-number collisions tolerated before checkout gives up.
const RECEIPT_NUMBER_ATTEMPTS: usize = 8;

// ---------------------------------------------------------------------------
// Chain plumbing
// ---------------------------------------------------------------------------

/// Await a chain call for at most `deadline`.
pub(crate) async fn bounded<T, F>(
    deadline: Duration,
    endpoint: &'static str,
    call: F,
) -> Result<T, ChainError>
where
    F: Future<Output = Result<T, ChainError>>,
{
    bounded_until(Instant::now() + deadline, endpoint, call).await
}

/// Await a chain call until `until`. Calls sharing one `until` share one
/// budget.
pub(crate) async fn bounded_until<T, F>(
    until: Instant,
    endpoint: &'static str,
    call: F,
) -> Result<T, ChainError>
where
    F: Future<Output = Result<T, ChainError>>,
{
    let budget = until.saturating_duration_since(Instant::now());
    match tokio::time::timeout_at(until, call).await {
        Ok(result) => result,
        Err(_) => Err(ChainError::Timeout {
            endpoint: endpoint.to_string(),
            after_ms: u64::try_from(budget.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}

/// Result of bringing the ledger up to date for one receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ChainWrite {
    /// Latest transaction observed, if any call succeeded.
    pub tx: Option<TxRef>,
    /// What the ledger still owes afterwards.
    pub sync: ChainSync,
}

/// Perform the chain writes in `owed`: record the order if it was never
/// observed, then confirm payment when `paid`. Stops at the first failure.
///
/// Both writes together get one chain deadline. Whatever a timed-out write
/// leaves owed is picked up by reconciliation.
pub(crate) async fn sync_to_chain(
    state: &AppState,
    order_hash: &OrderHash,
    owed: ChainSync,
    paid: bool,
) -> ChainWrite {
    let until = Instant::now() + state.config.chain_deadline;
    let mut write = ChainWrite {
        tx: None,
        sync: owed,
    };

    if write.sync == ChainSync::OrderPending {
        match bounded_until(until, "record_order", state.chain.record_order(order_hash)).await {
            Ok(tx) => {
                write.tx = Some(tx);
                write.sync = if paid {
                    ChainSync::PaymentPending
                } else {
                    ChainSync::Synced
                };
            }
            Err(e) => {
                tracing::warn!(order_hash = %order_hash, error = %e, "record_order failed");
                return write;
            }
        }
    }

    if write.sync == ChainSync::PaymentPending && paid {
        match bounded_until(until, "confirm_payment", state.chain.confirm_payment(order_hash)).await
        {
            Ok(tx) => {
                write.tx = Some(tx);
                write.sync = ChainSync::Synced;
            }
            Err(e) => {
                tracing::warn!(order_hash = %order_hash, error = %e, "confirm_payment failed");
            }
        }
    }

    write
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// Write a receipt through to Postgres. No-op without a pool.
pub(crate) async fn persist(state: &AppState, receipt: &Receipt) -> Result<(), sqlx::Error> {
    match &state.db_pool {
        Some(pool) => crate::db::receipts::upsert(pool, receipt).await,
        None => Ok(()),
    }
}

/// [`persist`], logging instead of failing. The in-memory record stays
/// authoritative for the running process.
pub(crate) async fn persist_logged(state: &AppState, receipt: &Receipt) {
    if let Err(e) = persist(state, receipt).await {
        tracing::error!(
            receipt_number = %receipt.receipt_number,
            error = %e,
            "failed to persist receipt"
        );
    }
}

// ---------------------------------------------------------------------------
// Checkout
// ---------------------------------------------------------------------------

/// Validated checkout inputs.
#[derive(Debug, Clone)]
pub struct CheckoutInput {
    pub cart: Vec<LineItem>,
    pub total: f64,
    pub store_id: StoreId,
    pub payment_method: PaymentMethod,
    /// Dwell time in minutes; non-finite or negative is treated as 0.
    pub time_spent: f64,
    /// Wallet as submitted. Validated by the reward pipeline, so a bad
    /// address never fails the checkout.
    pub wallet: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    pub receipt: Receipt,
    /// True when every chain write this receipt needs was observed.
    pub chain_synced: bool,
}

/// Create a receipt, record it on the append-only ledger, and queue the
/// reward. Never fails because of the chain.
pub async fn checkout(state: &AppState, input: CheckoutInput) -> Result<CheckoutOutcome, AppError> {
    validate_cart(&input.cart, input.total).map_err(|e| AppError::BadRequest(e.to_string()))?;

    let order_hash = generate_order_hash(&input.cart, input.total, &input.store_id)
        .map_err(|e| AppError::Internal(format!("order hash generation failed: {e}")))?;
    let time_spent = if input.time_spent.is_finite() && input.time_spent > 0.0 {
        input.time_spent
    } else {
        0.0
    };

    let receipt = insert_new_receipt(state, &input, &order_hash, time_spent)?;
    let number = receipt.receipt_number.clone();
    let _guard = state.locks.acquire(&number).await;

    if let Err(e) = persist(state, &receipt).await {
        tracing::error!(receipt_number = %number, error = %e, "failed to persist new receipt");
        if let Err(undo) = state.ledger.remove(&number) {
            tracing::error!(receipt_number = %number, error = %undo, "failed to roll back receipt");
        }
        return Err(AppError::Internal(format!("failed to persist receipt: {e}")));
    }

    let paid = !input.payment_method.is_cash();
    let write = sync_to_chain(state, &order_hash, ChainSync::OrderPending, paid).await;
    if write.sync != ChainSync::Synced {
        state.flow.record_chain_fallback();
        tracing::warn!(
            receipt_number = %number,
            order_hash = %order_hash,
            owed = write.sync.as_str(),
            "checkout continuing without full chain confirmation"
        );
    }
    let tx = write.tx.unwrap_or_else(|| TxRef::offline(&number));
    let receipt = state.ledger.record_chain(&number, tx, write.sync)?;
    persist_logged(state, &receipt).await;

    if let Some(wallet) = input.wallet {
        let job = RewardJob {
            order_hash: order_hash.clone(),
            wallet,
            total: input.total,
            time_spent,
        };
        if state.reward_queue.submit(job).is_err() {
            state.flow.record_reward_dropped();
        }
    }

    state.flow.record_checkout();
    tracing::info!(
        receipt_number = %number,
        order_hash = %order_hash,
        store_id = %receipt.store_id,
        payment_method = %receipt.payment_method,
        status = %receipt.status(),
        chain_sync = receipt.chain_sync.as_str(),
        "checkout completed"
    );

    Ok(CheckoutOutcome {
        chain_synced: !receipt.needs_chain_sync(),
        receipt,
    })
}

fn insert_new_receipt(
    state: &AppState,
    input: &CheckoutInput,
    order_hash: &OrderHash,
    time_spent: f64,
) -> Result<Receipt, AppError> {
    for _ in 0..RECEIPT_NUMBER_ATTEMPTS {
        let receipt_number = ReceiptNumber::generate()
            .map_err(|e| AppError::Internal(format!("receipt number generation failed: {e}")))?;
        let receipt = Receipt::new(NewReceipt {
            receipt_number,
            order_hash: order_hash.clone(),
            store_id: input.store_id.clone(),
            total_amount: input.total,
            items: input.cart.clone(),
            payment_method: input.payment_method,
            wallet_address: input
                .wallet
                .as_deref()
                .and_then(|w| WalletAddress::parse(w).ok()),
            time_spent_minutes: time_spent,
        });
        match state.ledger.insert(receipt.clone()) {
            Ok(()) => return Ok(receipt),
            Err(LedgerError::DuplicateReceipt(n)) => {
                tracing::debug!(receipt_number = %n, "receipt number collision, regenerating");
            }
            Err(e) => return Err(AppError::Internal(format!("receipt insert failed: {e}"))),
        }
    }
    Err(AppError::Internal(
        "could not allocate a unique receipt number".into(),
    ))
}

// ---------------------------------------------------------------------------
// Cashier
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MarkPaidOutcome {
    pub decision: CashierDecision,
    pub receipt: Receipt,
}

/// Confirm cash payment for a PENDING receipt. Idempotent: an already PAID
/// or VERIFIED receipt is reported as such and left untouched.
///
/// When `expected_hash` is given it must match the receipt's order hash.
pub async fn mark_paid(
    state: &AppState,
    number: &ReceiptNumber,
    expected_hash: Option<&OrderHash>,
) -> Result<MarkPaidOutcome, AppError> {
    let _guard = state.locks.acquire(number).await;
    let receipt = state.ledger.get_by_receipt_number(number)?;

    if let Some(hash) = expected_hash {
        if *hash != receipt.order_hash {
            tracing::warn!(receipt_number = %number, "order hash does not match receipt");
            return Err(AppError::Validation(
                "order hash does not match receipt".into(),
            ));
        }
    }

    let decision = cashier_decision(receipt.status());
    if decision == CashierDecision::AlreadyPaid {
        tracing::info!(receipt_number = %number, status = %receipt.status(), "receipt already paid");
        return Ok(MarkPaidOutcome { decision, receipt });
    }

    let owed = match receipt.chain_sync {
        ChainSync::OrderPending => ChainSync::OrderPending,
        ChainSync::Synced | ChainSync::PaymentPending => ChainSync::PaymentPending,
    };
    let write = sync_to_chain(state, &receipt.order_hash, owed, true).await;
    if write.sync != ChainSync::Synced {
        state.flow.record_chain_fallback();
    }
    let tx = write
        .tx
        .or(receipt.chain_tx_ref)
        .unwrap_or_else(|| TxRef::offline(number));
    state.ledger.record_chain(number, tx, write.sync)?;

    let (receipt, _) = state
        .ledger
        .transition_status(number, ReceiptStatus::Paid, Actor::Cashier)?;
    persist_logged(state, &receipt).await;

    state.flow.record_payment_confirmed();
    tracing::info!(
        receipt_number = %number,
        order_hash = %receipt.order_hash,
        chain_sync = receipt.chain_sync.as_str(),
        "payment confirmed by cashier"
    );
    Ok(MarkPaidOutcome { decision, receipt })
}

// ---------------------------------------------------------------------------
// Guard
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ExitVerdict {
    pub status: ExitStatus,
    /// The matched receipt. `None` for `INVALID_QR`.
    pub receipt: Option<Receipt>,
}

impl ExitVerdict {
    fn invalid() -> Self {
        Self {
            status: ExitStatus::InvalidQr,
            receipt: None,
        }
    }
}

/// Admit or refuse an exit for `raw_hash`. A PAID receipt is admitted only
/// when the append-only ledger also reports the order paid; admission
/// moves the receipt to VERIFIED, so each proof admits once.
pub async fn verify_exit(state: &AppState, raw_hash: &str) -> Result<ExitVerdict, AppError> {
    let Ok(order_hash) = OrderHash::parse(raw_hash) else {
        tracing::info!("exit refused: malformed order hash");
        state.flow.record_exit(false);
        return Ok(ExitVerdict::invalid());
    };
    verify(state, &order_hash, None).await
}

/// Decode a scanned proof and verify it. Anything that does not decode, or
/// whose receipt number disagrees with the ledger, is `INVALID_QR`.
pub async fn verify_proof(state: &AppState, payload: &str) -> Result<ExitVerdict, AppError> {
    let proof = match ExitProof::decode(payload) {
        Ok(p) => p,
        Err(e) => {
            tracing::info!(error = %e, "exit refused: proof did not decode");
            state.flow.record_exit(false);
            return Ok(ExitVerdict::invalid());
        }
    };
    verify(state, &proof.order_hash, Some(&proof.receipt_number)).await
}

async fn verify(
    state: &AppState,
    order_hash: &OrderHash,
    expected_receipt: Option<&ReceiptNumber>,
) -> Result<ExitVerdict, AppError> {
    let number = match state.ledger.get_by_order_hash(order_hash) {
        Ok(r) => r.receipt_number,
        Err(LedgerError::NotFound(_)) => {
            tracing::info!(order_hash = %order_hash, "exit refused: unknown order");
            state.flow.record_exit(false);
            return Ok(ExitVerdict::invalid());
        }
        Err(e) => return Err(e.into()),
    };
    if expected_receipt.is_some_and(|n| *n != number) {
        tracing::warn!(order_hash = %order_hash, "exit refused: proof names a different receipt");
        state.flow.record_exit(false);
        return Ok(ExitVerdict::invalid());
    }

    let _guard = state.locks.acquire(&number).await;
    let receipt = state.ledger.get_by_receipt_number(&number)?;

    let chain_view = if receipt.status() == ReceiptStatus::Paid {
        match bounded(
            state.config.chain_deadline,
            "query_status",
            state.chain.query_status(order_hash),
        )
        .await
        {
            Ok(status) => Some(status),
            Err(e) => {
                tracing::warn!(order_hash = %order_hash, error = %e, "chain unavailable for exit check");
                None
            }
        }
    } else {
        None
    };

    let verdict = guard_decision(receipt.status(), chain_view);
    let receipt = match verdict {
        Ok(()) => {
            let (receipt, _) =
                state
                    .ledger
                    .transition_status(&number, ReceiptStatus::Verified, Actor::Guard)?;
            persist_logged(state, &receipt).await;
            receipt
        }
        Err(_) => receipt,
    };

    let status = ExitStatus::from(verdict);
    state.flow.record_exit(status.is_allowed());
    tracing::info!(
        receipt_number = %number,
        order_hash = %order_hash,
        verdict = ?status,
        chain = ?chain_view,
        "exit verification"
    );
    Ok(ExitVerdict {
        status,
        receipt: Some(receipt),
    })
}

// ---------------------------------------------------------------------------
// Status read
// ---------------------------------------------------------------------------

/// Current receipt, advanced to PAID first when it is PENDING locally but
/// the append-only ledger already reports it paid. Chain failures are
/// logged and the local view returned.
pub async fn receipt_status(state: &AppState, number: &ReceiptNumber) -> Result<Receipt, AppError> {
    let receipt = state.ledger.get_by_receipt_number(number)?;
    if receipt.status() != ReceiptStatus::Pending || receipt.chain_sync == ChainSync::OrderPending
    {
        return Ok(receipt);
    }

    match bounded(
        state.config.chain_deadline,
        "query_status",
        state.chain.query_status(&receipt.order_hash),
    )
    .await
    {
        Ok(chain) => Ok(apply_chain_view(state, receipt, chain).await?),
        Err(e) => {
            tracing::warn!(receipt_number = %number, error = %e, "chain status unavailable");
            Ok(receipt)
        }
    }
}

/// Advance `receipt` if the chain is ahead of it. Returns the current record.
pub(crate) async fn apply_chain_view(
    state: &AppState,
    receipt: Receipt,
    chain: ChainOrderStatus,
) -> Result<Receipt, LedgerError> {
    let Some(to) = chain_advance(receipt.status(), chain) else {
        return Ok(receipt);
    };
    let number = receipt.receipt_number;
    let _guard = state.locks.acquire(&number).await;
    match state.ledger.transition_status(&number, to, Actor::Chain) {
        Ok((receipt, outcome)) => {
            if outcome.advanced() {
                tracing::info!(receipt_number = %number, status = %to, "receipt advanced from chain");
                persist_logged(state, &receipt).await;
            }
            Ok(receipt)
        }
        // Another action moved it further while we were querying.
        Err(LedgerError::InvalidTransition(_)) => state.ledger.get_by_receipt_number(&number),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppConfig;
    use scango_chain::{ChainMirror, MemoryChainMirror, MemoryRewardMinter};
    use std::sync::Arc;

    const WALLET: &str = "0x52908400098527886e0f7030069857d2e4169ee7";

    fn harness() -> (AppState, Arc<MemoryChainMirror>) {
        let mirror = Arc::new(MemoryChainMirror::new());
        let state = AppState::new(
            AppConfig::default(),
            mirror.clone(),
            Arc::new(MemoryRewardMinter::new()),
            None,
        );
        (state, mirror)
    }

    fn input(method: PaymentMethod) -> CheckoutInput {
        CheckoutInput {
            cart: vec![
                LineItem {
                    product_id: "sku-1".into(),
                    name: Some("Rice 1kg".into()),
                    quantity: 2,
                    unit_price: 75.0,
                    unit_mrp: 80.0,
                },
                LineItem {
                    product_id: "sku-2".into(),
                    name: None,
                    quantity: 1,
                    unit_price: 150.0,
                    unit_mrp: 150.0,
                },
            ],
            total: 300.0,
            store_id: StoreId::new("store-7").unwrap(),
            payment_method: method,
            time_spent: 10.0,
            wallet: Some(WALLET.to_string()),
        }
    }

    #[tokio::test]
    async fn cash_checkout_is_pending_and_synced() {
        let (state, mirror) = harness();
        let out = checkout(&state, input(PaymentMethod::Cash)).await.unwrap();
        assert_eq!(out.receipt.status(), ReceiptStatus::Pending);
        assert!(out.chain_synced);
        assert!(!out.receipt.chain_tx_ref.as_ref().unwrap().is_offline());
        assert_eq!(
            mirror.query_status(&out.receipt.order_hash).await.unwrap(),
            ChainOrderStatus::Created
        );
    }

    #[tokio::test]
    async fn card_checkout_is_paid_on_both_ledgers() {
        let (state, mirror) = harness();
        let out = checkout(&state, input(PaymentMethod::Card)).await.unwrap();
        assert_eq!(out.receipt.status(), ReceiptStatus::Paid);
        assert!(out.chain_synced);
        assert_eq!(
            mirror.query_status(&out.receipt.order_hash).await.unwrap(),
            ChainOrderStatus::Paid
        );
    }

    #[tokio::test]
    async fn checkout_survives_chain_outage() {
        let (state, mirror) = harness();
        mirror.set_online(false);
        let out = checkout(&state, input(PaymentMethod::Upi)).await.unwrap();
        let tx = out.receipt.chain_tx_ref.clone().unwrap();
        assert!(tx.is_offline());
        assert_eq!(tx.as_str(), format!("OFFLINE-{}", out.receipt.receipt_number));
        assert!(!out.chain_synced);
        assert_eq!(out.receipt.chain_sync, ChainSync::OrderPending);
        assert_eq!(out.receipt.status(), ReceiptStatus::Paid);
        assert_eq!(state.flow.chain_fallbacks(), 1);
    }

    #[tokio::test]
    async fn identical_carts_get_distinct_hashes() {
        let (state, _) = harness();
        let a = checkout(&state, input(PaymentMethod::Cash)).await.unwrap();
        let b = checkout(&state, input(PaymentMethod::Cash)).await.unwrap();
        assert_ne!(a.receipt.order_hash, b.receipt.order_hash);
        assert_ne!(a.receipt.receipt_number, b.receipt.receipt_number);
    }

    #[tokio::test]
    async fn invalid_cart_writes_nothing() {
        let (state, mirror) = harness();
        let mut bad = input(PaymentMethod::Cash);
        bad.cart.clear();
        assert!(matches!(
            checkout(&state, bad).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(state.ledger.is_empty());
        assert_eq!(mirror.calls(), 0);
    }

    #[tokio::test]
    async fn cashier_then_guard_then_replay() {
        let (state, _) = harness();
        let out = checkout(&state, input(PaymentMethod::Cash)).await.unwrap();
        let number = out.receipt.receipt_number.clone();
        let hash = out.receipt.order_hash.to_string();

        let pending = verify_exit(&state, &hash).await.unwrap();
        assert_eq!(pending.status, ExitStatus::PaymentPending);
        assert_eq!(
            state.ledger.get_by_receipt_number(&number).unwrap().status(),
            ReceiptStatus::Pending
        );

        let paid = mark_paid(&state, &number, None).await.unwrap();
        assert_eq!(paid.decision, CashierDecision::PaymentConfirmed);
        assert_eq!(paid.receipt.status(), ReceiptStatus::Paid);

        let again = mark_paid(&state, &number, None).await.unwrap();
        assert_eq!(again.decision, CashierDecision::AlreadyPaid);

        let allowed = verify_exit(&state, &hash).await.unwrap();
        assert_eq!(allowed.status, ExitStatus::ExitAllowed);
        assert_eq!(allowed.receipt.unwrap().item_count(), 3);

        let replay = verify_exit(&state, &hash).await.unwrap();
        assert_eq!(replay.status, ExitStatus::QrUsed);
        assert_eq!(state.flow.exits_allowed(), 1);
    }

    #[tokio::test]
    async fn mark_paid_rejects_mismatched_hash() {
        let (state, _) = harness();
        let out = checkout(&state, input(PaymentMethod::Cash)).await.unwrap();
        let other = OrderHash::from_digest(&[9; 32]);
        let err = mark_paid(&state, &out.receipt.receipt_number, Some(&other))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(
            state
                .ledger
                .get_by_receipt_number(&out.receipt.receipt_number)
                .unwrap()
                .status(),
            ReceiptStatus::Pending
        );
    }

    #[tokio::test]
    async fn mark_paid_unknown_receipt_is_not_found() {
        let (state, _) = harness();
        let n = ReceiptNumber::new("RCP-000000").unwrap();
        assert!(matches!(
            mark_paid(&state, &n, None).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn cashier_offline_leaves_payment_owed() {
        let (state, mirror) = harness();
        let out = checkout(&state, input(PaymentMethod::Cash)).await.unwrap();
        mirror.set_online(false);
        let paid = mark_paid(&state, &out.receipt.receipt_number, None).await.unwrap();
        assert_eq!(paid.receipt.status(), ReceiptStatus::Paid);
        assert_eq!(paid.receipt.chain_sync, ChainSync::PaymentPending);
    }

    #[tokio::test]
    async fn guard_refuses_when_chain_disagrees_or_is_down() {
        let (state, mirror) = harness();
        let out = checkout(&state, input(PaymentMethod::Cash)).await.unwrap();
        let hash = out.receipt.order_hash.to_string();

        // Locally PAID but the confirmation never reached the chain.
        mirror.set_online(false);
        mark_paid(&state, &out.receipt.receipt_number, None).await.unwrap();
        let down = verify_exit(&state, &hash).await.unwrap();
        assert_eq!(down.status, ExitStatus::PaymentPending);

        mirror.set_online(true);
        let behind = verify_exit(&state, &hash).await.unwrap();
        assert_eq!(behind.status, ExitStatus::PaymentPending);
        assert_eq!(
            state
                .ledger
                .get_by_receipt_number(&out.receipt.receipt_number)
                .unwrap()
                .status(),
            ReceiptStatus::Paid
        );
    }

    #[tokio::test]
    async fn unknown_or_malformed_hash_is_invalid_qr() {
        let (state, _) = harness();
        let unknown = OrderHash::from_digest(&[3; 32]).to_string();
        assert_eq!(
            verify_exit(&state, &unknown).await.unwrap().status,
            ExitStatus::InvalidQr
        );
        assert_eq!(
            verify_exit(&state, "0x1234").await.unwrap().status,
            ExitStatus::InvalidQr
        );
    }

    #[tokio::test]
    async fn proof_must_name_the_right_receipt() {
        let (state, _) = harness();
        let out = checkout(&state, input(PaymentMethod::Card)).await.unwrap();
        let tx = out.receipt.chain_tx_ref.clone().unwrap();

        let forged = ExitProof::new(
            out.receipt.order_hash.clone(),
            tx.clone(),
            ReceiptNumber::new("RCP-999999").unwrap(),
        );
        let verdict = verify_proof(&state, &forged.encode()).await.unwrap();
        assert_eq!(verdict.status, ExitStatus::InvalidQr);

        let genuine = ExitProof::new(
            out.receipt.order_hash.clone(),
            tx,
            out.receipt.receipt_number.clone(),
        );
        let verdict = verify_proof(&state, &genuine.encode()).await.unwrap();
        assert_eq!(verdict.status, ExitStatus::ExitAllowed);
    }

    #[tokio::test]
    async fn proof_missing_tx_hash_never_reaches_ledger() {
        let (state, mirror) = harness();
        let payload = format!(
            r#"{{"orderHash":"{}","receiptNumber":"RCP-000001"}}"#,
            OrderHash::from_digest(&[4; 32])
        );
        let verdict = verify_proof(&state, &payload).await.unwrap();
        assert_eq!(verdict.status, ExitStatus::InvalidQr);
        assert_eq!(mirror.calls(), 0);
    }

    #[tokio::test]
    async fn status_read_follows_chain_ahead() {
        let (state, mirror) = harness();
        let out = checkout(&state, input(PaymentMethod::Cash)).await.unwrap();
        // Payment confirmed on the chain by another terminal.
        mirror.confirm_payment(&out.receipt.order_hash).await.unwrap();

        let read = receipt_status(&state, &out.receipt.receipt_number).await.unwrap();
        assert_eq!(read.status(), ReceiptStatus::Paid);
        assert_eq!(read.transitions.last().unwrap().actor, Actor::Chain);
    }

    #[tokio::test]
    async fn status_read_with_chain_down_returns_local_view() {
        let (state, mirror) = harness();
        let out = checkout(&state, input(PaymentMethod::Cash)).await.unwrap();
        mirror.set_online(false);
        let read = receipt_status(&state, &out.receipt.receipt_number).await.unwrap();
        assert_eq!(read.status(), ReceiptStatus::Pending);
    }

    #[tokio::test]
    async fn concurrent_guards_admit_once() {
        let (state, _) = harness();
        let out = checkout(&state, input(PaymentMethod::Card)).await.unwrap();
        let hash = out.receipt.order_hash.to_string();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let state = state.clone();
                let hash = hash.clone();
                tokio::spawn(async move { verify_exit(&state, &hash).await.unwrap().status })
            })
            .collect();
        let mut allowed = 0;
        for h in handles {
            if h.await.unwrap() == ExitStatus::ExitAllowed {
                allowed += 1;
            }
        }
        assert_eq!(allowed, 1);
    }

    #[tokio::test]
    async fn slow_chain_is_cut_off_by_deadline() {
        struct Stalled;

        #[async_trait::async_trait]
        impl ChainMirror for Stalled {
            async fn record_order(&self, _: &OrderHash) -> Result<TxRef, ChainError> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Err(ChainError::Unavailable("stalled".into()))
            }
            async fn confirm_payment(&self, _: &OrderHash) -> Result<TxRef, ChainError> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Err(ChainError::Unavailable("stalled".into()))
            }
            async fn query_status(&self, _: &OrderHash) -> Result<ChainOrderStatus, ChainError> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Err(ChainError::Unavailable("stalled".into()))
            }
        }

        let config = AppConfig {
            chain_deadline: Duration::from_millis(50),
            ..AppConfig::default()
        };
        let state = AppState::new(
            config,
            Arc::new(Stalled),
            Arc::new(MemoryRewardMinter::new()),
            None,
        );
        let started = std::time::Instant::now();
        let out = checkout(&state, input(PaymentMethod::Cash)).await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(out.receipt.chain_tx_ref.unwrap().is_offline());
    }

    #[tokio::test(start_paused = true)]
    async fn record_and_confirm_share_one_deadline() {
        /// Records after most of the budget, then never confirms.
        struct SlowThenStalled;

        #[async_trait::async_trait]
        impl ChainMirror for SlowThenStalled {
            async fn record_order(&self, _: &OrderHash) -> Result<TxRef, ChainError> {
                tokio::time::sleep(Duration::from_millis(400)).await;
                Ok(TxRef::from_digest(&[7; 32]))
            }
            async fn confirm_payment(&self, _: &OrderHash) -> Result<TxRef, ChainError> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Err(ChainError::Unavailable("stalled".into()))
            }
            async fn query_status(&self, _: &OrderHash) -> Result<ChainOrderStatus, ChainError> {
                Ok(ChainOrderStatus::Created)
            }
        }

        let deadline = Duration::from_millis(500);
        let state = AppState::new(
            AppConfig {
                chain_deadline: deadline,
                ..AppConfig::default()
            },
            Arc::new(SlowThenStalled),
            Arc::new(MemoryRewardMinter::new()),
            None,
        );

        let started = Instant::now();
        let out = checkout(&state, input(PaymentMethod::Card)).await.unwrap();
        let elapsed = started.elapsed();
        assert!(elapsed >= deadline, "{elapsed:?}");
        assert!(elapsed < deadline + Duration::from_millis(50), "{elapsed:?}");

        // The record landed, so only the confirmation is owed.
        assert_eq!(out.receipt.chain_sync, ChainSync::PaymentPending);
        assert!(!out.receipt.chain_tx_ref.unwrap().is_offline());
        assert!(!out.chain_synced);
    }

    #[tokio::test]
    async fn failed_durable_write_rolls_back_the_receipt() {
        // Nothing listens on the discard port, so every write fails.
        let pool = sqlx::postgres::PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy("postgres://scango@127.0.0.1:9/scango")
            .unwrap();
        let mirror = Arc::new(MemoryChainMirror::new());
        let state = AppState::new(
            AppConfig::default(),
            mirror.clone(),
            Arc::new(MemoryRewardMinter::new()),
            Some(pool),
        );

        let err = checkout(&state, input(PaymentMethod::Card)).await.unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
        assert!(state.ledger.is_empty());
        assert_eq!(mirror.calls(), 0);
    }
}
