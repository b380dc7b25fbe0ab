//! # OpenAPI Specification Assembly
//!
//! Assembles the utoipa-documented routes into a single OpenAPI document,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Adds the staff bearer token scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some(
                            "Staff token of the form `{role}:{secret}` where role is \
                             cashier, guard, or manager. The secret is SCANGO_STAFF_TOKEN.",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "ScanGo API",
        version = "0.1.0",
        description = "Self-checkout order-to-exit verification: shopper checkout, cashier payment confirmation, and guard exit verification backed by an append-only ledger."
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    paths(
        crate::routes::orders::checkout,
        crate::routes::receipts::get_receipt,
        crate::routes::users::get_balance,
        crate::routes::cashier::mark_paid,
        crate::routes::guard::verify_exit,
        crate::routes::guard::verify_proof,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::error::ErrorCode,
        crate::routes::orders::CheckoutRequest,
        crate::routes::orders::CheckoutResponse,
        crate::routes::receipts::ReceiptView,
        crate::routes::receipts::TransitionView,
        crate::routes::users::RewardBalanceResponse,
        crate::routes::cashier::MarkPaidRequest,
        crate::routes::cashier::MarkPaidResponse,
        crate::routes::guard::VerifyExitRequest,
        crate::routes::guard::VerifyProofRequest,
        crate::routes::guard::VerifyExitResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "orders", description = "Shopper checkout"),
        (name = "receipts", description = "Receipt status polled by shopper devices"),
        (name = "users", description = "Loyalty reward balances"),
        (name = "cashier", description = "Cash payment confirmation (staff)"),
        (name = "guard", description = "Exit verification (staff)"),
    )
)]
pub struct ApiDoc;

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
