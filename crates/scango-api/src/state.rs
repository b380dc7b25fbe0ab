//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers via
//! the `State` extractor. Clone-friendly: every field is an `Arc` or a
//! handle over one.
//!
//! ## What lives here
//!
//! - **Receipt ledger** and the per-receipt action locks that serialize
//!   cashier, guard, and reconciliation work on one receipt.
//! - **Reward accounts**, the reward engine, and the queue feeding its
//!   background worker.
//! - **Chain mirror** for order and payment facts.
//! - **Database pool** (optional) for write-through persistence.
//! - **Metrics** and the last reconciliation report.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use sqlx::PgPool;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use scango_chain::{ChainMirror, MemoryChainMirror, MemoryRewardMinter, RewardMinter};
use scango_ledger::{MemoryReceiptLedger, ReceiptLedger, ReceiptLocks, RewardAccountStore};
use scango_reward::{spawn_reward_worker, RewardEngine, RewardQueue};

use crate::middleware::metrics::{ApiMetrics, FlowMetrics};
use crate::reconcile::ReconcileReport;

/// Application configuration.
///
/// Custom `Debug` redacts the staff token.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Shared staff secret. `None` disables staff authentication.
    pub staff_token: Option<String>,
    /// Upper bound on every awaited chain call made by a request handler.
    pub chain_deadline: Duration,
    /// Period of the reconciliation worker.
    pub reconcile_interval: Duration,
    /// Bounded capacity of the reward queue.
    pub reward_queue_capacity: usize,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field(
                "staff_token",
                &self.staff_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("chain_deadline", &self.chain_deadline)
            .field("reconcile_interval", &self.reconcile_interval)
            .field("reward_queue_capacity", &self.reward_queue_capacity)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            staff_token: None,
            chain_deadline: Duration::from_millis(2500),
            reconcile_interval: Duration::from_secs(30),
            reward_queue_capacity: 1024,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables. Unset or unparsable
    /// values fall back to the defaults.
    ///
    /// - `PORT` (default: 8080)
    /// - `SCANGO_STAFF_TOKEN` (optional; empty means unset)
    /// - `SCANGO_CHAIN_DEADLINE_MS` (default: 2500)
    /// - `SCANGO_RECONCILE_INTERVAL_SECS` (default: 30)
    /// - `SCANGO_REWARD_QUEUE_CAPACITY` (default: 1024)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: env_parse("PORT").unwrap_or(defaults.port),
            staff_token: std::env::var("SCANGO_STAFF_TOKEN")
                .ok()
                .filter(|t| !t.is_empty()),
            chain_deadline: env_parse("SCANGO_CHAIN_DEADLINE_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.chain_deadline),
            reconcile_interval: env_parse("SCANGO_RECONCILE_INTERVAL_SECS")
                .filter(|s: &u64| *s > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.reconcile_interval),
            reward_queue_capacity: env_parse("SCANGO_REWARD_QUEUE_CAPACITY")
                .filter(|c: &usize| *c > 0)
                .unwrap_or(defaults.reward_queue_capacity),
        }
    }
}

fn env_parse<T: std::str::FromStr>(var: &str) -> Option<T> {
    let raw = std::env::var(var).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(var, value = %raw, "ignoring unparsable environment value");
            None
        }
    }
}

/// Shared application state accessible to all route handlers.
#[derive(Clone)]
pub struct AppState {
    // -- Receipts --
    pub ledger: Arc<dyn ReceiptLedger>,
    pub locks: ReceiptLocks,

    // -- Rewards --
    pub rewards: Arc<RewardAccountStore>,
    pub reward_engine: Arc<RewardEngine>,
    pub reward_queue: RewardQueue,
    reward_worker: Arc<Mutex<Option<JoinHandle<()>>>>,

    // -- Append-only ledger --
    pub chain: Arc<dyn ChainMirror>,

    // -- Database persistence (optional) --
    /// When `Some`, receipts and reward state are written through to
    /// Postgres. When `None`, the service is in-memory only.
    pub db_pool: Option<PgPool>,

    // -- Observability --
    pub metrics: ApiMetrics,
    pub flow: FlowMetrics,
    pub last_reconcile: Arc<Mutex<Option<ReconcileReport>>>,

    shutdown: Arc<watch::Sender<bool>>,

    // -- Configuration --
    pub config: AppConfig,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("receipts", &self.ledger.len())
            .field("reward_engine", &self.reward_engine)
            .field("db_pool", &self.db_pool.is_some())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Build the state and start the reward worker.
    ///
    /// Must be called from within a Tokio runtime. When a database pool is
    /// given, reward state changes are journaled to it.
    pub fn new(
        config: AppConfig,
        chain: Arc<dyn ChainMirror>,
        minter: Arc<dyn RewardMinter>,
        db_pool: Option<PgPool>,
    ) -> Self {
        let rewards = Arc::new(RewardAccountStore::new());
        let mut engine = RewardEngine::new(rewards.clone(), minter);
        if let Some(pool) = &db_pool {
            engine = engine.with_journal(Arc::new(crate::db::rewards::PgRewardJournal::new(
                pool.clone(),
            )));
        }
        let reward_engine = Arc::new(engine);

        let metrics = ApiMetrics::new();
        if let Err(e) = reward_engine.stats().register(metrics.registry()) {
            tracing::warn!(error = %e, "reward counters not exported");
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let (reward_queue, worker) = spawn_reward_worker(
            reward_engine.clone(),
            config.reward_queue_capacity,
            shutdown_rx,
        );

        Self {
            ledger: Arc::new(MemoryReceiptLedger::new()),
            locks: ReceiptLocks::new(),
            rewards,
            reward_engine,
            reward_queue,
            reward_worker: Arc::new(Mutex::new(Some(worker))),
            chain,
            db_pool,
            flow: metrics.flow().clone(),
            metrics,
            last_reconcile: Arc::new(Mutex::new(None)),
            shutdown: Arc::new(shutdown),
            config,
        }
    }

    /// In-memory state backed by an in-process chain mirror and minter.
    pub fn in_memory(config: AppConfig) -> Self {
        Self::new(
            config,
            Arc::new(MemoryChainMirror::new()),
            Arc::new(MemoryRewardMinter::new()),
            None,
        )
    }

    /// Receiver that turns `true` when shutdown begins.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Signal background tasks to stop and wait for the reward worker to
    /// drain its queue.
    pub async fn shutdown(&self) {
        self.shutdown.send_replace(true);
        let worker = self.reward_worker.lock().take();
        if let Some(handle) = worker {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "reward worker panicked");
            }
        }
    }

    /// Hydrate in-memory stores from the database.
    ///
    /// Called once on startup when a database pool is available.
    pub async fn hydrate_from_db(&self) -> Result<(), String> {
        let pool = match &self.db_pool {
            Some(pool) => pool,
            None => return Ok(()),
        };

        let receipts = crate::db::receipts::load_all(pool)
            .await
            .map_err(|e| format!("failed to load receipts: {e}"))?;
        let receipt_count = receipts.len();
        for receipt in receipts {
            let number = receipt.receipt_number.clone();
            if let Err(e) = self.ledger.insert(receipt) {
                tracing::warn!(receipt_number = %number, error = %e, "skipping receipt during hydration");
            }
        }

        let accounts = crate::db::rewards::load_accounts(pool)
            .await
            .map_err(|e| format!("failed to load reward accounts: {e}"))?;
        let credits = crate::db::rewards::load_credits(pool)
            .await
            .map_err(|e| format!("failed to load reward credits: {e}"))?;
        let account_count = accounts.len();
        let credit_count = credits.len();
        self.rewards.restore(accounts, credits);

        tracing::info!(
            receipts = receipt_count,
            reward_accounts = account_count,
            reward_credits = credit_count,
            "Hydrated in-memory stores from database"
        );

        Ok(())
    }
}
