//! JSON bodies exchanged with the ledger gateway.

use serde::{Deserialize, Serialize};

use scango_core::{ChainOrderStatus, OrderHash, TxRef, WalletAddress};

/// Body of `POST /v1/orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordOrderBody {
    pub order_hash: OrderHash,
}

/// Any write acknowledged with a transaction reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub tx_hash: TxRef,
}

/// Response of `GET /v1/orders/{orderHash}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub order_hash: OrderHash,
    pub status: ChainOrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<TxRef>,
}

/// Body of `POST /v1/rewards/mint` as received. The wallet is kept raw so
/// the receiver can validate it through `MintRequest::new`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintBody {
    pub wallet: String,
    pub amount: u64,
    pub session_id: OrderHash,
}

/// Response of `GET /v1/rewards/{wallet}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceView {
    pub wallet: WalletAddress,
    pub balance: u64,
}
