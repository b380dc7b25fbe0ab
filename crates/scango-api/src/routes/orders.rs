//! # Checkout API
//!
//! `POST /api/orders/checkout` creates a receipt, records it on the
//! append-only ledger within the chain deadline, and queues the reward.
//! A ledger outage never fails the checkout; the response carries an
//! `OFFLINE-` transaction reference and `chainSynced: false` instead.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use scango_core::{LineItem, PaymentMethod, StoreId};

use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::orchestration::{self, CheckoutInput};
use crate::state::AppState;

/// Checkout request. Fields are optional at the serde layer so that a
/// missing field is reported with the same 400 as an empty one.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    /// Scanned line items. Must be non-empty.
    #[schema(value_type = Vec<Object>)]
    pub cart: Option<Vec<LineItem>>,
    /// Order total. Must be greater than zero.
    pub total: Option<f64>,
    pub store_id: Option<String>,
    /// CASH, CARD, or UPI (case-insensitive). Defaults to CASH.
    pub payment_method: Option<String>,
    /// Minutes spent in store.
    pub time_spent: Option<f64>,
    /// Wallet credited with the loyalty reward. A malformed address
    /// forfeits the reward but not the checkout.
    pub wallet_address: Option<String>,
}

impl Validate for CheckoutRequest {
    fn validate(&self) -> Result<(), String> {
        if self.cart.as_ref().map_or(true, Vec::is_empty) {
            return Err("cart must contain at least one item".into());
        }
        match self.total {
            Some(t) if t.is_finite() && t > 0.0 => {}
            _ => return Err("total must be greater than zero".into()),
        }
        if self
            .store_id
            .as_deref()
            .map_or(true, |s| s.trim().is_empty())
        {
            return Err("storeId must be non-empty".into());
        }
        Ok(())
    }
}

impl TryFrom<CheckoutRequest> for CheckoutInput {
    type Error = AppError;

    fn try_from(req: CheckoutRequest) -> Result<Self, Self::Error> {
        let bad = |e: scango_core::ValidationError| AppError::BadRequest(e.to_string());
        let payment_method = match req.payment_method.as_deref() {
            None | Some("") => PaymentMethod::default(),
            Some(raw) => raw.parse().map_err(bad)?,
        };
        let wallet = req
            .wallet_address
            .map(|w| w.trim().to_string())
            .filter(|w| !w.is_empty());
        Ok(CheckoutInput {
            cart: req.cart.unwrap_or_default(),
            total: req.total.unwrap_or_default(),
            store_id: StoreId::new(req.store_id.unwrap_or_default()).map_err(bad)?,
            payment_method,
            time_spent: req.time_spent.unwrap_or_default(),
            wallet,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub success: bool,
    pub order_hash: String,
    pub receipt_number: String,
    /// PENDING for cash, PAID otherwise.
    pub status: String,
    /// Ledger transaction, or `OFFLINE-{receiptNumber}` when not yet observed.
    pub tx_hash: String,
    pub chain_synced: bool,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/orders/checkout", post(checkout))
}

/// POST /api/orders/checkout
#[utoipa::path(
    post,
    path = "/api/orders/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Receipt created", body = CheckoutResponse),
        (status = 400, description = "Invalid cart, total, store, or payment method", body = crate::error::ErrorBody),
        (status = 500, description = "Receipt could not be created", body = crate::error::ErrorBody),
    ),
    tag = "orders"
)]
pub(crate) async fn checkout(
    State(state): State<AppState>,
    body: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<Json<CheckoutResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let input = CheckoutInput::try_from(req)?;
    let outcome = orchestration::checkout(&state, input).await?;
    let receipt = outcome.receipt;

    Ok(Json(CheckoutResponse {
        success: true,
        order_hash: receipt.order_hash.to_string(),
        receipt_number: receipt.receipt_number.to_string(),
        status: receipt.status().to_string(),
        tx_hash: receipt
            .chain_tx_ref
            .map(String::from)
            .unwrap_or_default(),
        chain_synced: outcome.chain_synced,
    }))
}
