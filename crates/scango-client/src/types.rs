//! Request and response bodies of the ScanGo API.
//!
//! Response types ignore unknown fields so that the client keeps working
//! against newer servers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use scango_core::{LineItem, ReceiptStatus};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub cart: Vec<LineItem>,
    pub total: f64,
    pub store_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_spent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub success: bool,
    pub order_hash: String,
    pub receipt_number: String,
    pub status: ReceiptStatus,
    pub tx_hash: String,
    pub chain_synced: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkPaidResponse {
    pub success: bool,
    /// PAYMENT_CONFIRMED or ALREADY_PAID.
    pub result: String,
    pub status: ReceiptStatus,
    pub chain_synced: bool,
}

/// Guard verdict for one exit scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitVerdict {
    pub allowed: bool,
    pub status: String,
    #[serde(default)]
    pub item_count: Option<u32>,
    #[serde(default)]
    pub receipt_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptView {
    pub receipt_number: String,
    pub order_hash: String,
    pub store_id: String,
    pub status: ReceiptStatus,
    pub payment_method: String,
    pub total_amount: f64,
    pub item_count: u32,
    #[serde(default)]
    pub tx_hash: Option<String>,
    pub chain_synced: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardBalance {
    pub wallet_address: String,
    pub reward_balance: u64,
}

/// `{"error": {"code", "message"}}` body returned on failure.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorPayload,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayload {
    pub code: String,
    pub message: String,
}
