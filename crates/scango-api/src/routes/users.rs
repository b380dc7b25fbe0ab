//! # Reward Balance API

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use scango_core::WalletAddress;

use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RewardBalanceResponse {
    /// Normalized (lowercase) wallet address, or the input as given when it
    /// is not a valid address.
    pub wallet_address: String,
    pub reward_balance: u64,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/users/:wallet", get(get_balance))
}

/// GET /api/users/{wallet}: local reward balance. Unknown and malformed
/// wallets both read as 0.
#[utoipa::path(
    get,
    path = "/api/users/{wallet}",
    params(("wallet" = String, Path, description = "Wallet address; 0x-prefixed, 40 hex digits")),
    responses(
        (status = 200, description = "Reward balance", body = RewardBalanceResponse),
    ),
    tag = "users"
)]
pub(crate) async fn get_balance(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
) -> Json<RewardBalanceResponse> {
    match WalletAddress::parse(wallet.as_str()) {
        Ok(wallet) => Json(RewardBalanceResponse {
            reward_balance: state.rewards.balance(&wallet),
            wallet_address: wallet.to_string(),
        }),
        Err(e) => {
            tracing::debug!(error = %e, "balance requested for malformed wallet");
            Json(RewardBalanceResponse {
                wallet_address: wallet,
                reward_balance: 0,
            })
        }
    }
}
