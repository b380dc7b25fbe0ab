//! Reward persistence operations.
//!
//! Operates on the `reward_accounts` and `reward_credits` tables. The
//! in-memory store decides whether an order credits a wallet; this module
//! only mirrors the result so a restart does not double-credit.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use scango_core::{OrderHash, TxRef, WalletAddress};
use scango_ledger::{RewardAccount, RewardCredit};
use scango_reward::RewardJournal;

/// Insert or overwrite a reward account's balance.
pub async fn upsert_account(pool: &PgPool, account: &RewardAccount) -> Result<(), sqlx::Error> {
    let balance = i64::try_from(account.reward_balance)
        .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
    sqlx::query(
        "INSERT INTO reward_accounts (wallet_address, reward_balance, updated_at)
         VALUES ($1, $2, $3)
         ON CONFLICT (wallet_address) DO UPDATE SET
           reward_balance = EXCLUDED.reward_balance,
           updated_at = EXCLUDED.updated_at",
    )
    .bind(account.wallet_address.as_str())
    .bind(balance)
    .bind(account.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Insert a credit, or record its mint transaction once observed.
pub async fn upsert_credit(pool: &PgPool, credit: &RewardCredit) -> Result<(), sqlx::Error> {
    let amount =
        i64::try_from(credit.amount).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
    sqlx::query(
        "INSERT INTO reward_credits (order_hash, wallet_address, amount, mint_tx, credited_at)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (order_hash) DO UPDATE SET
           mint_tx = COALESCE(EXCLUDED.mint_tx, reward_credits.mint_tx)",
    )
    .bind(credit.order_hash.as_str())
    .bind(credit.wallet_address.as_str())
    .bind(amount)
    .bind(credit.mint_tx.as_ref().map(TxRef::as_str))
    .bind(credit.credited_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn load_accounts(pool: &PgPool) -> Result<Vec<RewardAccount>, sqlx::Error> {
    let rows = sqlx::query_as::<_, AccountRow>(
        "SELECT wallet_address, reward_balance, updated_at FROM reward_accounts",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().filter_map(AccountRow::into_record).collect())
}

pub async fn load_credits(pool: &PgPool) -> Result<Vec<RewardCredit>, sqlx::Error> {
    let rows = sqlx::query_as::<_, CreditRow>(
        "SELECT order_hash, wallet_address, amount, mint_tx, credited_at
         FROM reward_credits ORDER BY credited_at",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().filter_map(CreditRow::into_record).collect())
}

/// [`RewardJournal`] that writes every credit and mint through to Postgres.
///
/// Write failures are logged, not surfaced: the reward worker has no caller
/// to report to, and the next change to the same account rewrites it.
#[derive(Debug, Clone)]
pub struct PgRewardJournal {
    pool: PgPool,
}

impl PgRewardJournal {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RewardJournal for PgRewardJournal {
    async fn record(&self, account: &RewardAccount, credit: &RewardCredit) {
        // Account first: the credit row references it.
        if let Err(e) = upsert_account(&self.pool, account).await {
            tracing::error!(wallet = %account.wallet_address, error = %e, "failed to persist reward account");
            return;
        }
        if let Err(e) = upsert_credit(&self.pool, credit).await {
            tracing::error!(order_hash = %credit.order_hash, error = %e, "failed to persist reward credit");
        }
    }
}

#[derive(sqlx::FromRow)]
struct AccountRow {
    wallet_address: String,
    reward_balance: i64,
    updated_at: DateTime<Utc>,
}

impl AccountRow {
    fn into_record(self) -> Option<RewardAccount> {
        let wallet_address = match WalletAddress::parse(self.wallet_address.as_str()) {
            Ok(w) => w,
            Err(e) => {
                tracing::error!(wallet = %self.wallet_address, error = %e, "stored wallet is invalid; skipping");
                return None;
            }
        };
        Some(RewardAccount {
            wallet_address,
            reward_balance: u64::try_from(self.reward_balance).unwrap_or(0),
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CreditRow {
    order_hash: String,
    wallet_address: String,
    amount: i64,
    mint_tx: Option<String>,
    credited_at: DateTime<Utc>,
}

impl CreditRow {
    fn into_record(self) -> Option<RewardCredit> {
        let parsed = OrderHash::parse(self.order_hash.as_str()).map_err(|e| e.to_string()).and_then(
            |order_hash| {
                WalletAddress::parse(self.wallet_address.as_str())
                    .map(|wallet| (order_hash, wallet))
                    .map_err(|e| e.to_string())
            },
        );
        let (order_hash, wallet_address) = match parsed {
            Ok(keys) => keys,
            Err(e) => {
                tracing::error!(order_hash = %self.order_hash, error = %e, "stored reward credit is invalid; skipping");
                return None;
            }
        };
        Some(RewardCredit {
            order_hash,
            wallet_address,
            amount: u64::try_from(self.amount).unwrap_or(0),
            mint_tx: self.mint_tx.and_then(|tx| TxRef::new(tx).ok()),
            credited_at: self.credited_at,
        })
    }
}
