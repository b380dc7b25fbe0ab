//! # scango-chain-stub — Binary Entry Point
//!
//! Serves the development ledger gateway. Binds to `PORT` (default 8545).

use scango_chain_stub::StubState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if std::env::var("SCANGO_LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8545);

    let app = scango_chain_stub::app(StubState::default());

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::warn!("development ledger gateway: nothing is durable");
    tracing::info!("ScanGo ledger stub listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
