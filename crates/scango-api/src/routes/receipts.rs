//! # Receipt Status API
//!
//! `GET /api/receipts/{receiptNumber}` is the read polled by shopper
//! devices while waiting at the exit. A PENDING receipt is checked against
//! the append-only ledger first and advanced when the ledger is ahead.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use scango_core::ReceiptNumber;
use scango_state::Receipt;

use crate::error::AppError;
use crate::orchestration;
use crate::state::AppState;

/// One entry of the receipt's status history.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransitionView {
    pub from: Option<String>,
    pub to: String,
    /// checkout, cashier, guard, or chain.
    pub actor: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptView {
    pub receipt_number: String,
    pub order_hash: String,
    pub store_id: String,
    /// PENDING, PAID, or VERIFIED.
    pub status: String,
    pub payment_method: String,
    pub total_amount: f64,
    pub item_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    pub chain_synced: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub transitions: Vec<TransitionView>,
}

impl From<Receipt> for ReceiptView {
    fn from(r: Receipt) -> Self {
        let transitions = r
            .transitions
            .iter()
            .map(|t| TransitionView {
                from: t.from.map(|s| s.to_string()),
                to: t.to.to_string(),
                actor: match t.actor {
                    scango_state::Actor::Checkout => "checkout",
                    scango_state::Actor::Cashier => "cashier",
                    scango_state::Actor::Guard => "guard",
                    scango_state::Actor::Chain => "chain",
                }
                .to_string(),
                at: t.at,
            })
            .collect();
        Self {
            status: r.status().to_string(),
            item_count: r.item_count(),
            chain_synced: !r.needs_chain_sync(),
            receipt_number: r.receipt_number.to_string(),
            order_hash: r.order_hash.to_string(),
            store_id: r.store_id.to_string(),
            payment_method: r.payment_method.to_string(),
            total_amount: r.total_amount,
            tx_hash: r.chain_tx_ref.map(String::from),
            created_at: r.created_at,
            updated_at: r.updated_at,
            transitions,
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/receipts/:receipt_number", get(get_receipt))
}

/// GET /api/receipts/{receiptNumber}
#[utoipa::path(
    get,
    path = "/api/receipts/{receiptNumber}",
    params(("receiptNumber" = String, Path, description = "Receipt number, e.g. RCP-004211")),
    responses(
        (status = 200, description = "Current receipt", body = ReceiptView),
        (status = 404, description = "Unknown receipt", body = crate::error::ErrorBody),
        (status = 422, description = "Malformed receipt number", body = crate::error::ErrorBody),
    ),
    tag = "receipts"
)]
pub(crate) async fn get_receipt(
    State(state): State<AppState>,
    Path(receipt_number): Path<String>,
) -> Result<Json<ReceiptView>, AppError> {
    let number = ReceiptNumber::new(receipt_number)?;
    let receipt = orchestration::receipt_status(&state, &number).await?;
    Ok(Json(receipt.into()))
}
