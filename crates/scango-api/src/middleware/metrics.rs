//! # Service Metrics
//!
//! One Prometheus [`Registry`] per service instance, owned by [`ApiMetrics`].
//!
//! - HTTP traffic is pushed by [`metrics_middleware`]: request count and
//!   latency by method, route and status.
//! - Flow outcomes (checkouts, chain fallbacks, exits) are pushed by the
//!   orchestration layer through [`FlowMetrics`].
//! - Receipt and reconciliation gauges are pulled on each `/metrics` scrape.
//!
//! Reward pipeline counters live in `scango-reward` and are registered into
//! the same registry when the state is built.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use prometheus::core::Collector;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
    Opts, Registry, TextEncoder,
};

/// Registry plus the HTTP and flow metrics. Clones share the registry.
#[derive(Clone)]
pub struct ApiMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,

    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    http_errors_total: IntCounterVec,

    flow: FlowMetrics,

    // Set on scrape.
    receipts: IntGaugeVec,
    rewards_unminted: IntGauge,
    reconcile_still_owed: IntGauge,
    reconcile_synced: IntGauge,
    reconcile_advanced: IntGauge,
}

impl std::fmt::Debug for ApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiMetrics")
            .field("requests", &self.requests())
            .field("errors", &self.errors())
            .finish_non_exhaustive()
    }
}

/// Register a metric whose name and labels are fixed at compile time.
fn register<M>(registry: &Registry, metric: prometheus::Result<M>) -> M
where
    M: Collector + Clone + 'static,
{
    let metric = metric.expect("metric can be created");
    registry
        .register(Box::new(metric.clone()))
        .expect("metric names are unique");
    metric
}

impl ApiMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let http_requests_total = register(
            &registry,
            IntCounterVec::new(
                Opts::new("scango_http_requests_total", "HTTP requests served"),
                &["method", "path", "status"],
            ),
        );
        let http_request_duration_seconds = register(
            &registry,
            HistogramVec::new(
                HistogramOpts::new(
                    "scango_http_request_duration_seconds",
                    "HTTP request latency in seconds",
                )
                .buckets(vec![
                    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
                ]),
                &["method", "path"],
            ),
        );
        let http_errors_total = register(
            &registry,
            IntCounterVec::new(
                Opts::new("scango_http_errors_total", "HTTP responses with a 4xx or 5xx status"),
                &["method", "path", "status"],
            ),
        );

        let flow = FlowMetrics::register(&registry);

        let receipts = register(
            &registry,
            IntGaugeVec::new(
                Opts::new("scango_receipts", "Receipts held, by status"),
                &["status"],
            ),
        );
        let rewards_unminted = register(
            &registry,
            IntGauge::new("scango_rewards_unminted", "Credited rewards not yet minted"),
        );
        let reconcile_still_owed = register(
            &registry,
            IntGauge::new(
                "scango_reconcile_still_owed",
                "Chain writes still owed after the last reconcile pass",
            ),
        );
        let reconcile_synced = register(
            &registry,
            IntGauge::new("scango_reconcile_synced_last", "Receipts synced by the last reconcile pass"),
        );
        let reconcile_advanced = register(
            &registry,
            IntGauge::new(
                "scango_reconcile_advanced_last",
                "Receipts whose chain status advanced in the last reconcile pass",
            ),
        );

        Self {
            inner: Arc::new(Inner {
                registry,
                http_requests_total,
                http_request_duration_seconds,
                http_errors_total,
                flow,
                receipts,
                rewards_unminted,
                reconcile_still_owed,
                reconcile_synced,
                reconcile_advanced,
            }),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub fn flow(&self) -> &FlowMetrics {
        &self.inner.flow
    }

    /// Requests summed over every label set.
    pub fn requests(&self) -> u64 {
        sum_counters(&self.inner.http_requests_total)
    }

    /// 4xx and 5xx responses summed over every label set.
    pub fn errors(&self) -> u64 {
        sum_counters(&self.inner.http_errors_total)
    }

    /// Error count for one status code across all routes.
    pub fn errors_with_status(&self, status: u16) -> u64 {
        let wanted = status.to_string();
        let mut total = 0;
        for family in self.inner.http_errors_total.collect() {
            for m in family.get_metric() {
                let matches = m
                    .get_label()
                    .iter()
                    .any(|l| l.get_name() == "status" && l.get_value() == wanted);
                if matches {
                    total += m.get_counter().get_value() as u64;
                }
            }
        }
        total
    }

    fn record_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.inner
            .http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
        if status >= 400 {
            self.inner
                .http_errors_total
                .with_label_values(&[method, path, &status_str])
                .inc();
        }
    }

    // -- Scrape-time gauges --

    pub fn receipts(&self) -> &IntGaugeVec {
        &self.inner.receipts
    }

    pub fn rewards_unminted(&self) -> &IntGauge {
        &self.inner.rewards_unminted
    }

    pub fn set_reconcile(&self, still_owed: u64, synced: u64, advanced: u64) {
        self.inner.reconcile_still_owed.set(still_owed as i64);
        self.inner.reconcile_synced.set(synced as i64);
        self.inner.reconcile_advanced.set(advanced as i64);
    }

    /// Gather every registered family into the Prometheus text format.
    pub fn gather_and_encode(&self) -> Result<String, String> {
        let families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&families, &mut buffer)
            .map_err(|e| format!("failed to encode metrics: {e}"))?;
        String::from_utf8(buffer).map_err(|e| format!("metrics text is not UTF-8: {e}"))
    }
}

impl Default for ApiMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn sum_counters(vec: &IntCounterVec) -> u64 {
    vec.collect()
        .iter()
        .flat_map(|family| family.get_metric())
        .map(|m| m.get_counter().get_value() as u64)
        .sum()
}

/// Counters for checkout, payment and exit outcomes.
///
/// Clones share the underlying counters.
#[derive(Clone)]
pub struct FlowMetrics {
    checkouts: IntCounter,
    chain_fallbacks: IntCounter,
    payments_confirmed: IntCounter,
    exits: IntCounterVec,
    rewards_dropped: IntCounter,
}

impl std::fmt::Debug for FlowMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowMetrics")
            .field("checkouts", &self.checkouts())
            .field("exits_allowed", &self.exits_allowed())
            .field("exits_denied", &self.exits_denied())
            .finish_non_exhaustive()
    }
}

impl FlowMetrics {
    fn register(registry: &Registry) -> Self {
        Self {
            checkouts: register(
                registry,
                IntCounter::new("scango_checkouts_total", "Receipts issued at checkout"),
            ),
            chain_fallbacks: register(
                registry,
                IntCounter::new(
                    "scango_chain_fallbacks_total",
                    "Chain writes absorbed with an offline reference or left owed",
                ),
            ),
            payments_confirmed: register(
                registry,
                IntCounter::new("scango_payments_confirmed_total", "Cash payments confirmed by a cashier"),
            ),
            exits: register(
                registry,
                IntCounterVec::new(
                    Opts::new("scango_exits_total", "Exit verifications by outcome"),
                    &["outcome"],
                ),
            ),
            rewards_dropped: register(
                registry,
                IntCounter::new(
                    "scango_rewards_dropped_total",
                    "Reward jobs dropped because the queue was full",
                ),
            ),
        }
    }

    pub fn record_checkout(&self) {
        self.checkouts.inc();
    }

    pub fn record_chain_fallback(&self) {
        self.chain_fallbacks.inc();
    }

    pub fn record_payment_confirmed(&self) {
        self.payments_confirmed.inc();
    }

    pub fn record_exit(&self, allowed: bool) {
        let outcome = if allowed { "allowed" } else { "denied" };
        self.exits.with_label_values(&[outcome]).inc();
    }

    pub fn record_reward_dropped(&self) {
        self.rewards_dropped.inc();
    }

    pub fn checkouts(&self) -> u64 {
        self.checkouts.get()
    }

    pub fn chain_fallbacks(&self) -> u64 {
        self.chain_fallbacks.get()
    }

    pub fn payments_confirmed(&self) -> u64 {
        self.payments_confirmed.get()
    }

    pub fn exits_allowed(&self) -> u64 {
        self.exits.with_label_values(&["allowed"]).get()
    }

    pub fn exits_denied(&self) -> u64 {
        self.exits.with_label_values(&["denied"]).get()
    }

    pub fn rewards_dropped(&self) -> u64 {
        self.rewards_dropped.get()
    }
}

/// Collapse identifiers in a raw path so labels stay low-cardinality.
///
/// Only used when the router did not record a [`MatchedPath`].
fn normalize_path(path: &str) -> String {
    let mut previous = "";
    path.split('/')
        .map(|segment| {
            let label = if segment.starts_with("RCP-") {
                "{receiptNumber}"
            } else if previous == "users" && !segment.is_empty() {
                "{wallet}"
            } else if is_hex_id(segment) {
                "{id}"
            } else {
                segment
            };
            previous = segment;
            label
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn is_hex_id(segment: &str) -> bool {
    segment
        .strip_prefix("0x")
        .is_some_and(|hex| hex.len() >= 40 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Record method, route, status and latency for every API request.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();
    let method = request.method().to_string();
    let path = match request.extensions().get::<MatchedPath>() {
        Some(matched) => matched.as_str().to_string(),
        None => normalize_path(request.uri().path()),
    };
    let start = Instant::now();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        m.record_request(
            &method,
            &path,
            response.status().as_u16(),
            start.elapsed().as_secs_f64(),
        );
    }
    response
}
