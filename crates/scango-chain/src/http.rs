//! Typed HTTP clients for the ledger gateway.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use scango_core::{ChainOrderStatus, OrderHash, TxRef, WalletAddress};

use crate::config::{ChainConfig, RetryPolicy};
use crate::error::ChainError;
use crate::mint::MintRequest;
use crate::retry::retry_send;
use crate::wire::{BalanceView, OrderView, RecordOrderBody, TxReceipt};
use crate::{ChainMirror, RewardMinter};

/// API version path on the gateway.
const API_PREFIX: &str = "v1";

/// Top-level gateway client. Holds the order and reward sub-clients over one
/// connection pool.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    orders: HttpChainMirror,
    rewards: HttpRewardMinter,
}

impl GatewayClient {
    pub fn new(config: &ChainConfig) -> Result<Self, ChainError> {
        let mut builder = reqwest::Client::builder().timeout(config.request_timeout);
        if let Some(token) = &config.api_token {
            let mut headers = reqwest::header::HeaderMap::new();
            let value = reqwest::header::HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| ChainError::Rejected {
                    endpoint: "client_init".into(),
                    reason: "api token is not a valid header value".into(),
                })?;
            headers.insert(reqwest::header::AUTHORIZATION, value);
            builder = builder.default_headers(headers);
        }
        let http = builder.build().map_err(|e| ChainError::Http {
            endpoint: "client_init".into(),
            source: e,
        })?;

        let transport = Transport {
            http,
            base_url: config.gateway_url.clone(),
            retry: config.retry,
            deadline: config.call_deadline,
        };
        Ok(Self {
            orders: HttpChainMirror {
                transport: transport.clone(),
            },
            rewards: HttpRewardMinter { transport },
        })
    }

    pub fn orders(&self) -> &HttpChainMirror {
        &self.orders
    }

    pub fn rewards(&self) -> &HttpRewardMinter {
        &self.rewards
    }

    pub fn into_parts(self) -> (HttpChainMirror, HttpRewardMinter) {
        (self.orders, self.rewards)
    }
}

// -- Transport ----------------------------------------------------------------

#[derive(Debug, Clone)]
struct Transport {
    http: reqwest::Client,
    base_url: Url,
    retry: RetryPolicy,
    deadline: Duration,
}

impl Transport {
    fn url(&self, path: &str) -> String {
        format!("{}{}/{}", self.base_url, API_PREFIX, path)
    }

    /// Cap an operation, retries included, at the configured deadline.
    async fn bounded<T>(
        &self,
        endpoint: &str,
        op: impl Future<Output = Result<T, ChainError>>,
    ) -> Result<T, ChainError> {
        match tokio::time::timeout(self.deadline, op).await {
            Ok(result) => result,
            Err(_) => Err(ChainError::Timeout {
                endpoint: endpoint.to_string(),
                after_ms: self.deadline.as_millis() as u64,
            }),
        }
    }

    async fn post<B, T>(&self, endpoint: &str, path: &str, body: &B) -> Result<T, ChainError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        self.bounded(endpoint, async {
            let url = self.url(path);
            let resp = retry_send(self.retry, || self.http.post(&url).json(body).send())
                .await
                .map_err(|e| ChainError::Http {
                    endpoint: endpoint.to_string(),
                    source: e,
                })?;
            decode(endpoint, resp).await
        })
        .await
    }

    /// GET returning `None` on 404.
    async fn get_optional<T>(&self, endpoint: &str, path: &str) -> Result<Option<T>, ChainError>
    where
        T: DeserializeOwned,
    {
        self.bounded(endpoint, async {
            let url = self.url(path);
            let resp = retry_send(self.retry, || self.http.get(&url).send())
                .await
                .map_err(|e| ChainError::Http {
                    endpoint: endpoint.to_string(),
                    source: e,
                })?;
            if resp.status() == reqwest::StatusCode::NOT_FOUND {
                return Ok(None);
            }
            decode(endpoint, resp).await.map(Some)
        })
        .await
    }
}

async fn decode<T: DeserializeOwned>(
    endpoint: &str,
    resp: reqwest::Response,
) -> Result<T, ChainError> {
    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .unwrap_or_else(|e| format!("<failed to read response body: {e}>"));
        return Err(ChainError::Api {
            endpoint: endpoint.to_string(),
            status,
            body,
        });
    }
    resp.json().await.map_err(|e| ChainError::Deserialization {
        endpoint: endpoint.to_string(),
        source: e,
    })
}

// -- Orders -------------------------------------------------------------------

/// [`ChainMirror`] over the gateway's order endpoints.
#[derive(Debug, Clone)]
pub struct HttpChainMirror {
    transport: Transport,
}

#[async_trait]
impl ChainMirror for HttpChainMirror {
    /// Calls `POST {base_url}/v1/orders`.
    async fn record_order(&self, order_hash: &OrderHash) -> Result<TxRef, ChainError> {
        let body = RecordOrderBody {
            order_hash: order_hash.clone(),
        };
        let receipt: TxReceipt = self
            .transport
            .post("POST /v1/orders", "orders", &body)
            .await?;
        tracing::debug!(order_hash = %order_hash, tx = %receipt.tx_hash, "order recorded on ledger");
        Ok(receipt.tx_hash)
    }

    /// Calls `POST {base_url}/v1/orders/{orderHash}/payment`.
    async fn confirm_payment(&self, order_hash: &OrderHash) -> Result<TxRef, ChainError> {
        let receipt: TxReceipt = self
            .transport
            .post(
                "POST /v1/orders/{orderHash}/payment",
                &format!("orders/{order_hash}/payment"),
                &serde_json::json!({}),
            )
            .await?;
        tracing::debug!(order_hash = %order_hash, tx = %receipt.tx_hash, "payment confirmed on ledger");
        Ok(receipt.tx_hash)
    }

    /// Calls `GET {base_url}/v1/orders/{orderHash}`.
    async fn query_status(&self, order_hash: &OrderHash) -> Result<ChainOrderStatus, ChainError> {
        let view: Option<OrderView> = self
            .transport
            .get_optional("GET /v1/orders/{orderHash}", &format!("orders/{order_hash}"))
            .await?;
        Ok(view.map_or(ChainOrderStatus::Unknown, |v| v.status))
    }
}

// -- Rewards ------------------------------------------------------------------

/// [`RewardMinter`] over the gateway's reward endpoints.
#[derive(Debug, Clone)]
pub struct HttpRewardMinter {
    transport: Transport,
}

#[async_trait]
impl RewardMinter for HttpRewardMinter {
    /// Calls `POST {base_url}/v1/rewards/mint`.
    async fn mint(&self, req: &MintRequest) -> Result<TxRef, ChainError> {
        let receipt: TxReceipt = self
            .transport
            .post("POST /v1/rewards/mint", "rewards/mint", req)
            .await?;
        Ok(receipt.tx_hash)
    }

    /// Calls `GET {base_url}/v1/rewards/{wallet}`. Unknown wallets have
    /// balance 0.
    async fn balance_of(&self, wallet: &WalletAddress) -> Result<u64, ChainError> {
        let view: Option<BalanceView> = self
            .transport
            .get_optional("GET /v1/rewards/{wallet}", &format!("rewards/{wallet}"))
            .await?;
        Ok(view.map_or(0, |v| v.balance))
    }
}
