//! # Guard API
//!
//! Exit verification. Both endpoints answer 200 with a verdict; a refused
//! exit is a normal outcome, not an error. Requires the `guard` role.
//!
//! | Status | Meaning |
//! |--------|---------|
//! | `EXIT_ALLOWED` | Paid on both ledgers; receipt is now VERIFIED |
//! | `PAYMENT_PENDING` | Not yet paid, or the chain has not confirmed payment |
//! | `QR_USED` | Receipt already VERIFIED |
//! | `INVALID_QR` | Malformed proof or unknown order |

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use scango_state::ExitStatus;

use crate::auth::{require_role, StaffIdentity, StaffRole};
use crate::error::AppError;
use crate::extractors::extract_json;
use crate::orchestration::{self, ExitVerdict};
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyExitRequest {
    pub order_hash: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyProofRequest {
    /// Raw scanned QR payload.
    pub payload: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyExitResponse {
    pub allowed: bool,
    /// INVALID_QR, PAYMENT_PENDING, QR_USED, or EXIT_ALLOWED.
    pub status: String,
    /// Units in the order; absent for INVALID_QR.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_number: Option<String>,
}

fn status_str(status: ExitStatus) -> &'static str {
    match status {
        ExitStatus::InvalidQr => "INVALID_QR",
        ExitStatus::PaymentPending => "PAYMENT_PENDING",
        ExitStatus::QrUsed => "QR_USED",
        ExitStatus::ExitAllowed => "EXIT_ALLOWED",
    }
}

impl From<ExitVerdict> for VerifyExitResponse {
    fn from(verdict: ExitVerdict) -> Self {
        Self {
            allowed: verdict.status.is_allowed(),
            status: status_str(verdict.status).to_string(),
            item_count: verdict.receipt.as_ref().map(|r| r.item_count()),
            receipt_number: verdict.receipt.map(|r| r.receipt_number.to_string()),
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/guard/verify-exit", post(verify_exit))
        .route("/api/guard/verify-proof", post(verify_proof))
}

/// POST /api/guard/verify-exit
#[utoipa::path(
    post,
    path = "/api/guard/verify-exit",
    request_body = VerifyExitRequest,
    responses(
        (status = 200, description = "Exit verdict", body = VerifyExitResponse),
        (status = 401, description = "Missing or invalid staff token", body = crate::error::ErrorBody),
        (status = 403, description = "Caller is not a guard", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "guard"
)]
pub(crate) async fn verify_exit(
    State(state): State<AppState>,
    caller: StaffIdentity,
    body: Result<Json<VerifyExitRequest>, JsonRejection>,
) -> Result<Json<VerifyExitResponse>, AppError> {
    require_role(&caller, StaffRole::Guard)?;
    let req = extract_json(body)?;
    let verdict = orchestration::verify_exit(&state, &req.order_hash).await?;
    Ok(Json(verdict.into()))
}

/// POST /api/guard/verify-proof
#[utoipa::path(
    post,
    path = "/api/guard/verify-proof",
    request_body = VerifyProofRequest,
    responses(
        (status = 200, description = "Exit verdict", body = VerifyExitResponse),
        (status = 401, description = "Missing or invalid staff token", body = crate::error::ErrorBody),
        (status = 403, description = "Caller is not a guard", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "guard"
)]
pub(crate) async fn verify_proof(
    State(state): State<AppState>,
    caller: StaffIdentity,
    body: Result<Json<VerifyProofRequest>, JsonRejection>,
) -> Result<Json<VerifyExitResponse>, AppError> {
    require_role(&caller, StaffRole::Guard)?;
    let req = extract_json(body)?;
    let verdict = orchestration::verify_proof(&state, &req.payload).await?;
    Ok(Json(verdict.into()))
}
