//! Typed client for the ScanGo API.
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | POST | `/api/orders/checkout` | [`ScanGoClient::checkout`] |
//! | GET | `/api/receipts/{receiptNumber}` | [`ScanGoClient::receipt`] |
//! | GET | `/api/users/{wallet}` | [`ScanGoClient::reward_balance`] |
//! | POST | `/api/cashier/mark-paid` | [`ScanGoClient::mark_paid`] |
//! | POST | `/api/guard/verify-exit` | [`ScanGoClient::verify_exit`] |
//! | POST | `/api/guard/verify-proof` | [`ScanGoClient::verify_proof`] |

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use scango_core::{OrderHash, ReceiptNumber, ReceiptStatus, WalletAddress};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::poller::StatusSource;
use crate::types::{
    CheckoutRequest, CheckoutResponse, ErrorEnvelope, ExitVerdict, MarkPaidResponse,
    ReceiptView, RewardBalance,
};

#[derive(Debug, Clone)]
pub struct ScanGoClient {
    http: reqwest::Client,
    base_url: Url,
    staff_token: Option<String>,
}

impl ScanGoClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;
        Ok(Self {
            http,
            base_url: config.base_url,
            staff_token: config.staff_token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn staff(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.staff_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        req: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let resp = req.send().await.map_err(|e| ClientError::Http {
            endpoint: endpoint.to_string(),
            source: e,
        })?;
        decode(endpoint, resp).await
    }

    async fn post_staff<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let req = self.staff(self.http.post(self.url(path)).json(body));
        self.send(endpoint, req).await
    }

    /// Submit a cart. A ledger outage is not an error here; the response
    /// reports `chain_synced: false` instead.
    pub async fn checkout(&self, req: &CheckoutRequest) -> Result<CheckoutResponse, ClientError> {
        let builder = self.http.post(self.url("api/orders/checkout")).json(req);
        self.send("POST /api/orders/checkout", builder).await
    }

    pub async fn receipt(&self, number: &ReceiptNumber) -> Result<ReceiptView, ClientError> {
        let builder = self.http.get(self.url(&format!("api/receipts/{number}")));
        self.send("GET /api/receipts/{receiptNumber}", builder).await
    }

    /// Reward balance for display. Any failure is logged and reads as 0 so
    /// that the balance never blocks the shopper's screen.
    pub async fn reward_balance(&self, wallet: &WalletAddress) -> u64 {
        match self.try_reward_balance(wallet).await {
            Ok(balance) => balance,
            Err(e) => {
                tracing::warn!(wallet = %wallet, error = %e, "reward balance unavailable; showing 0");
                0
            }
        }
    }

    pub async fn try_reward_balance(&self, wallet: &WalletAddress) -> Result<u64, ClientError> {
        let builder = self.http.get(self.url(&format!("api/users/{wallet}")));
        let body: RewardBalance = self.send("GET /api/users/{wallet}", builder).await?;
        Ok(body.reward_balance)
    }

    /// Cashier: confirm a cash payment. Idempotent; a repeat reports
    /// `ALREADY_PAID`.
    pub async fn mark_paid(
        &self,
        receipt: &ReceiptNumber,
        order_hash: Option<&OrderHash>,
    ) -> Result<MarkPaidResponse, ClientError> {
        let body = serde_json::json!({
            "receiptNumber": receipt,
            "orderHash": order_hash,
        });
        self.post_staff("POST /api/cashier/mark-paid", "api/cashier/mark-paid", &body)
            .await
    }

    /// Guard: verify by order hash. The hash is sent as scanned; the server
    /// answers INVALID_QR for anything malformed.
    pub async fn verify_exit(&self, order_hash: &str) -> Result<ExitVerdict, ClientError> {
        let body = serde_json::json!({ "orderHash": order_hash });
        self.post_staff("POST /api/guard/verify-exit", "api/guard/verify-exit", &body)
            .await
    }

    /// Guard: verify a raw scanned QR payload.
    pub async fn verify_proof(&self, payload: &str) -> Result<ExitVerdict, ClientError> {
        let body = serde_json::json!({ "payload": payload });
        self.post_staff("POST /api/guard/verify-proof", "api/guard/verify-proof", &body)
            .await
    }
}

#[async_trait]
impl StatusSource for ScanGoClient {
    async fn receipt_status(&self, receipt: &ReceiptNumber) -> Result<ReceiptStatus, ClientError> {
        Ok(self.receipt(receipt).await?.status)
    }
}

async fn decode<T: DeserializeOwned>(
    endpoint: &str,
    resp: reqwest::Response,
) -> Result<T, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let text = resp
            .text()
            .await
            .unwrap_or_else(|e| format!("<failed to read response body: {e}>"));
        let (code, message) = match serde_json::from_str::<ErrorEnvelope>(&text) {
            Ok(envelope) => (envelope.error.code, envelope.error.message),
            Err(_) => ("UNKNOWN".to_string(), text),
        };
        return Err(ClientError::Api {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            code,
            message,
        });
    }
    resp.json().await.map_err(|e| ClientError::Deserialization {
        endpoint: endpoint.to_string(),
        source: e,
    })
}
