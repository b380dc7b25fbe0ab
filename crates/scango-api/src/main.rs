//! # scango-api — Binary Entry Point
//!
//! Starts the Axum HTTP server for the ScanGo service.
//! Binds to a configurable port (default 8080).

use std::sync::Arc;

use scango_api::state::{AppConfig, AppState};
use scango_chain::{ChainConfig, ChainMirror, GatewayClient, MemoryChainMirror, MemoryRewardMinter, RewardMinter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured tracing. SCANGO_LOG_FORMAT=json switches to
    // one JSON object per line.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if std::env::var("SCANGO_LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = AppConfig::from_env();
    let port = config.port;
    if config.staff_token.is_none() {
        tracing::warn!("SCANGO_STAFF_TOKEN not set: staff routes are unauthenticated");
    }

    // Initialize database pool (optional; absent means in-memory only).
    let db_pool = scango_api::db::init_pool().await.map_err(|e| {
        tracing::error!("Database initialization failed: {e}");
        e
    })?;

    // Append-only ledger gateway. Without one, an in-process mirror
    // stands in and nothing is anchored outside this process.
    let (chain, minter): (Arc<dyn ChainMirror>, Arc<dyn RewardMinter>) =
        match ChainConfig::from_env() {
            Ok(chain_config) => {
                let gateway = GatewayClient::new(&chain_config).map_err(|e| {
                    tracing::error!("Failed to create chain gateway client: {e}");
                    e
                })?;
                tracing::info!(gateway = %chain_config.gateway_url, "Chain gateway configured");
                let (orders, rewards) = gateway.into_parts();
                (Arc::new(orders), Arc::new(rewards))
            }
            Err(e) => {
                tracing::warn!("Chain gateway not configured: {e}. Using in-process ledger mirror.");
                (
                    Arc::new(MemoryChainMirror::new()),
                    Arc::new(MemoryRewardMinter::new()),
                )
            }
        };

    let state = AppState::new(config, chain, minter, db_pool);

    // Hydrate in-memory stores from database (if connected).
    state.hydrate_from_db().await.map_err(|e| {
        tracing::error!("Database hydration failed: {e}");
        e
    })?;

    let reconciler = scango_api::reconcile::spawn_reconciler(state.clone());
    let app = scango_api::app(state.clone());

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("ScanGo API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("HTTP server stopped; draining background workers");
    state.shutdown().await;
    if let Err(e) = reconciler.await {
        tracing::error!("Reconciliation worker panicked: {e}");
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
