//! # Cashier API
//!
//! `POST /api/cashier/mark-paid` confirms cash payment for a PENDING
//! receipt. Repeating the call on a PAID or VERIFIED receipt succeeds with
//! `ALREADY_PAID` and changes nothing. Requires the `cashier` role.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use scango_core::{OrderHash, ReceiptNumber};
use scango_state::CashierDecision;

use crate::auth::{require_role, StaffIdentity, StaffRole};
use crate::error::AppError;
use crate::extractors::extract_json;
use crate::orchestration;
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarkPaidRequest {
    pub receipt_number: String,
    /// When present, must match the receipt's order hash.
    pub order_hash: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarkPaidResponse {
    pub success: bool,
    /// PAYMENT_CONFIRMED or ALREADY_PAID.
    pub result: String,
    pub status: String,
    pub chain_synced: bool,
}

fn decision_str(decision: CashierDecision) -> &'static str {
    match decision {
        CashierDecision::PaymentConfirmed => "PAYMENT_CONFIRMED",
        CashierDecision::AlreadyPaid => "ALREADY_PAID",
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/cashier/mark-paid", post(mark_paid))
}

/// POST /api/cashier/mark-paid
#[utoipa::path(
    post,
    path = "/api/cashier/mark-paid",
    request_body = MarkPaidRequest,
    responses(
        (status = 200, description = "Payment confirmed or already recorded", body = MarkPaidResponse),
        (status = 401, description = "Missing or invalid staff token", body = crate::error::ErrorBody),
        (status = 403, description = "Caller is not a cashier", body = crate::error::ErrorBody),
        (status = 404, description = "Unknown receipt", body = crate::error::ErrorBody),
        (status = 422, description = "Malformed input or order hash mismatch", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "cashier"
)]
pub(crate) async fn mark_paid(
    State(state): State<AppState>,
    caller: StaffIdentity,
    body: Result<Json<MarkPaidRequest>, JsonRejection>,
) -> Result<Json<MarkPaidResponse>, AppError> {
    require_role(&caller, StaffRole::Cashier)?;
    let req = extract_json(body)?;
    let number = ReceiptNumber::new(req.receipt_number)?;
    let expected_hash = req.order_hash.map(OrderHash::parse).transpose()?;

    let outcome = orchestration::mark_paid(&state, &number, expected_hash.as_ref()).await?;
    Ok(Json(MarkPaidResponse {
        success: true,
        result: decision_str(outcome.decision).to_string(),
        status: outcome.receipt.status().to_string(),
        chain_synced: !outcome.receipt.needs_chain_sync(),
    }))
}
