//! # scango-chain-stub — Development Ledger Gateway
//!
//! Serves the ledger gateway REST API over [`MemoryChainMirror`] and
//! [`MemoryRewardMinter`], so the API service can run its HTTP chain client
//! end to end without a real ledger.
//!
//! | Method | Path | Behavior |
//! |--------|------|----------|
//! | POST | `/v1/orders` | Record an order (idempotent) |
//! | POST | `/v1/orders/{orderHash}/payment` | Confirm payment; 409 if unrecorded |
//! | GET | `/v1/orders/{orderHash}` | Order view; 404 if unknown |
//! | POST | `/v1/rewards/mint` | Mint, idempotent per `sessionId` |
//! | GET | `/v1/rewards/{wallet}` | On-ledger reward balance |
//! | PUT | `/admin/online` | Toggle a simulated outage |
//!
//! Orders only move created → paid. Nothing is durable.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use scango_chain::wire::{BalanceView, MintBody, RecordOrderBody, TxReceipt};
use scango_chain::{ChainError, ChainMirror, MemoryChainMirror, MemoryRewardMinter, MintRequest, RewardMinter};
use scango_core::{OrderHash, ValidationError, WalletAddress};

#[derive(Debug, Clone, Default)]
pub struct StubState {
    pub orders: Arc<MemoryChainMirror>,
    pub rewards: Arc<MemoryRewardMinter>,
}

pub fn app(state: StubState) -> Router {
    Router::new()
        .route("/v1/orders", post(record_order))
        .route("/v1/orders/:order_hash", get(get_order))
        .route("/v1/orders/:order_hash/payment", post(confirm_payment))
        .route("/v1/rewards/mint", post(mint))
        .route("/v1/rewards/:wallet", get(balance))
        .route("/admin/online", put(set_online))
        .route("/health/liveness", get(|| async { "ok" }))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, thiserror::Error)]
pub enum StubError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error("order {0} is not recorded")]
    UnknownOrder(OrderHash),
}

impl IntoResponse for StubError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::UnknownOrder(_) => StatusCode::NOT_FOUND,
            Self::Chain(ChainError::Rejected { .. }) => StatusCode::CONFLICT,
            Self::Chain(ChainError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Chain(ChainError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Chain(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::warn!(error = %self, "ledger stub request failed");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

async fn record_order(
    State(state): State<StubState>,
    Json(body): Json<RecordOrderBody>,
) -> Result<Json<TxReceipt>, StubError> {
    let tx_hash = state.orders.record_order(&body.order_hash).await?;
    tracing::info!(order_hash = %body.order_hash, tx = %tx_hash, "order recorded");
    Ok(Json(TxReceipt { tx_hash }))
}

async fn confirm_payment(
    State(state): State<StubState>,
    Path(order_hash): Path<String>,
) -> Result<Json<TxReceipt>, StubError> {
    let order_hash = OrderHash::parse(order_hash)?;
    let tx_hash = state.orders.confirm_payment(&order_hash).await?;
    tracing::info!(order_hash = %order_hash, tx = %tx_hash, "payment confirmed");
    Ok(Json(TxReceipt { tx_hash }))
}

async fn get_order(
    State(state): State<StubState>,
    Path(order_hash): Path<String>,
) -> Result<Response, StubError> {
    let order_hash = OrderHash::parse(order_hash)?;
    // Counts the call and honors the outage switch.
    state.orders.query_status(&order_hash).await?;
    match state.orders.order(&order_hash) {
        Some(view) => Ok(Json(view).into_response()),
        None => Err(StubError::UnknownOrder(order_hash)),
    }
}

async fn mint(
    State(state): State<StubState>,
    Json(body): Json<MintBody>,
) -> Result<Json<TxReceipt>, StubError> {
    let req = MintRequest::new(&body.wallet, body.amount, &body.session_id)?;
    let tx_hash = state.rewards.mint(&req).await?;
    tracing::info!(session_id = %body.session_id, amount = body.amount, tx = %tx_hash, "reward minted");
    Ok(Json(TxReceipt { tx_hash }))
}

async fn balance(
    State(state): State<StubState>,
    Path(wallet): Path<String>,
) -> Result<Json<BalanceView>, StubError> {
    let wallet = WalletAddress::parse(wallet)?;
    let balance = state.rewards.balance_of(&wallet).await?;
    Ok(Json(BalanceView { wallet, balance }))
}

#[derive(Debug, Deserialize)]
struct OnlineBody {
    online: bool,
}

async fn set_online(State(state): State<StubState>, Json(body): Json<OnlineBody>) -> StatusCode {
    state.orders.set_online(body.online);
    state.rewards.set_online(body.online);
    tracing::warn!(online = body.online, "ledger availability switched");
    StatusCode::NO_CONTENT
}
