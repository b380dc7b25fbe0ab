//! # Postgres Write-Through
//!
//! Receipts and reward state are copied to Postgres after every in-memory
//! change, and read back once at startup by
//! [`AppState::hydrate_from_db`](crate::state::AppState::hydrate_from_db).
//! Request handling never reads from the database.
//!
//! Without `DATABASE_URL` the service keeps everything in memory.

pub mod receipts;
pub mod rewards;

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

const MAX_CONNECTIONS: u32 = 20;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Connect to `DATABASE_URL` and apply the embedded migrations.
///
/// `Ok(None)` when the variable is unset or blank.
pub async fn init_pool() -> Result<Option<PgPool>, sqlx::Error> {
    let Some(url) = std::env::var("DATABASE_URL")
        .ok()
        .filter(|u| !u.trim().is_empty())
    else {
        tracing::warn!("DATABASE_URL unset: receipts and reward balances are lost on restart");
        return Ok(None);
    };

    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .min_connections(2)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(&url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!(max_connections = MAX_CONNECTIONS, "receipt database ready");

    Ok(Some(pool))
}

/// Round trip used by the readiness probe.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await.map(|_| ())
}
