//! # scango-api — Axum API Service for ScanGo
//!
//! Hosts the three parties of the self-checkout flow: the shopper device
//! (checkout, receipt polling, reward balance), the cashier (cash payment
//! confirmation), and the exit guard (QR verification). Every receipt fact
//! that matters at the exit is mirrored to an append-only ledger through
//! [`scango_chain::ChainMirror`].
//!
//! ## API Surface
//!
//! | Route                                | Module                | Auth  |
//! |--------------------------------------|-----------------------|-------|
//! | `POST /api/orders/checkout`          | [`routes::orders`]    | none  |
//! | `GET /api/receipts/{receiptNumber}`  | [`routes::receipts`]  | none  |
//! | `GET /api/users/{wallet}`            | [`routes::users`]     | none  |
//! | `POST /api/cashier/mark-paid`        | [`routes::cashier`]   | staff |
//! | `POST /api/guard/verify-exit`        | [`routes::guard`]     | staff |
//! | `POST /api/guard/verify-proof`       | [`routes::guard`]     | staff |
//! | `GET /health/*`, `/metrics`          | this module           | none  |
//! | `GET /openapi.json`                  | [`openapi`]           | none  |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware (staff routes only) → Handler
//! ```
//!
//! ## Background Work
//!
//! - The reward worker drains [`scango_reward::RewardQueue`].
//! - [`reconcile::spawn_reconciler`] replays owed chain writes and mints.

pub mod auth;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod orchestration;
pub mod reconcile;
pub mod routes;
pub mod state;

use std::collections::HashMap;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::middleware::from_fn;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
///
/// Shopper routes carry no credentials; staff routes sit behind
/// [`auth::auth_middleware`]. Health probes and `/metrics` are mounted
/// outside the HTTP metrics layer.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.staff_token.clone(),
    };

    let staff = Router::new()
        .merge(routes::cashier::router())
        .merge(routes::guard::router())
        .layer(from_fn(auth::auth_middleware));

    let api = Router::new()
        .merge(routes::orders::router())
        .merge(routes::receipts::router())
        .merge(routes::users::router())
        .merge(openapi::router())
        .merge(staff)
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(auth_config))
        .layer(axum::Extension(state.metrics.clone()))
        .with_state(state.clone());

    let ops = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(metrics))
        .with_state(state);

    Router::new().merge(ops).merge(api)
}

/// Liveness probe. Always 200 while the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe. 503 when a database is configured but unreachable.
async fn readiness(State(state): State<AppState>) -> (StatusCode, &'static str) {
    if let Some(pool) = &state.db_pool {
        if let Err(e) = db::ping(pool).await {
            tracing::warn!(error = %e, "readiness check failed: database unreachable");
            return (StatusCode::SERVICE_UNAVAILABLE, "database unavailable");
        }
    }
    (StatusCode::OK, "ready")
}

/// Prometheus exposition. Gauges are refreshed from state on each scrape.
async fn metrics(State(state): State<AppState>) -> Response {
    let metrics = &state.metrics;

    let mut by_status: HashMap<&'static str, i64> = HashMap::new();
    for receipt in state.ledger.scan(&|_| true) {
        *by_status.entry(receipt.status().as_str()).or_default() += 1;
    }
    metrics.receipts().reset();
    for (status, count) in by_status {
        metrics.receipts().with_label_values(&[status]).set(count);
    }
    metrics
        .rewards_unminted()
        .set(state.rewards.unminted().len() as i64);
    let last = state.last_reconcile.lock().clone().unwrap_or_default();
    metrics.set_reconcile(last.still_owed, last.synced, last.advanced);

    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "metrics encoding failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}
