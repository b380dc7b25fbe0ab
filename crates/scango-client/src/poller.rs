//! # Receipt Status Poller
//!
//! Shopper-side loop that re-reads a receipt's status until the guard has
//! verified it. The loop:
//!
//! - makes no request during `initial_delay` (the device is still showing
//!   its verification animation);
//! - then polls every `interval`, skipping ticks missed while a request
//!   was in flight;
//! - stops once VERIFIED is observed, or when the [`PollerHandle`] is
//!   stopped or dropped.
//!
//! A failed poll is logged and retried on the next tick. Only a run of
//! `degraded_after` consecutive failures is surfaced, as
//! [`PollState::degraded`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use scango_core::{ReceiptNumber, ReceiptStatus};

use crate::error::ClientError;

/// Where the poller reads status from.
#[async_trait]
pub trait StatusSource: Send + Sync + 'static {
    async fn receipt_status(&self, receipt: &ReceiptNumber) -> Result<ReceiptStatus, ClientError>;
}

#[derive(Debug, Clone, Copy)]
pub struct PollerConfig {
    pub initial_delay: Duration,
    pub interval: Duration,
    /// Consecutive failures before the state is flagged degraded.
    pub degraded_after: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(2500),
            interval: Duration::from_secs(3),
            degraded_after: 5,
        }
    }
}

/// What the poller has observed so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollState {
    /// Last status read successfully.
    pub status: Option<ReceiptStatus>,
    pub consecutive_failures: u32,
    pub degraded: bool,
    /// VERIFIED was observed; no further polls will run.
    pub finished: bool,
}

impl PollState {
    pub fn is_verified(&self) -> bool {
        self.status == Some(ReceiptStatus::Verified)
    }
}

pub struct StatusPoller<S> {
    source: Arc<S>,
    config: PollerConfig,
}

impl<S: StatusSource> StatusPoller<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            config: PollerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PollerConfig) -> Self {
        self.config = config;
        self
    }

    /// Start polling `receipt`. `known` is the status the caller already
    /// holds; a receipt known to be VERIFIED is never polled.
    pub fn spawn(self, receipt: ReceiptNumber, known: Option<ReceiptStatus>) -> PollerHandle {
        let initial = PollState {
            status: known,
            finished: known == Some(ReceiptStatus::Verified),
            ..PollState::default()
        };
        let (tx, rx) = watch::channel(initial.clone());
        if initial.finished {
            return PollerHandle { state: rx, task: None };
        }

        let task = tokio::spawn(poll_loop(self.source, self.config, receipt, tx));
        PollerHandle {
            state: rx,
            task: Some(task),
        }
    }
}

async fn poll_loop<S: StatusSource>(
    source: Arc<S>,
    config: PollerConfig,
    receipt: ReceiptNumber,
    state: watch::Sender<PollState>,
) {
    tokio::time::sleep(config.initial_delay).await;

    let mut ticker = tokio::time::interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        match source.receipt_status(&receipt).await {
            Ok(status) => {
                let verified = status == ReceiptStatus::Verified;
                state.send_modify(|s| {
                    if s.degraded {
                        tracing::info!(receipt_number = %receipt, "receipt status reachable again");
                    }
                    s.status = Some(status);
                    s.consecutive_failures = 0;
                    s.degraded = false;
                    s.finished = verified;
                });
                if verified {
                    tracing::debug!(receipt_number = %receipt, "receipt verified; polling stopped");
                    return;
                }
            }
            Err(e) => {
                tracing::warn!(receipt_number = %receipt, error = %e, "receipt status poll failed");
                state.send_modify(|s| {
                    s.consecutive_failures += 1;
                    s.degraded = s.consecutive_failures >= config.degraded_after;
                });
            }
        }
    }
}

/// Owner of a running poller. Dropping it aborts the polling task.
#[derive(Debug)]
pub struct PollerHandle {
    state: watch::Receiver<PollState>,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    pub fn current(&self) -> PollState {
        self.state.borrow().clone()
    }

    /// A receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<PollState> {
        self.state.clone()
    }

    /// Wait until VERIFIED is observed. Returns `None` if the poller was
    /// stopped first.
    pub async fn verified(&mut self) -> Option<PollState> {
        match self.state.wait_for(|s| s.finished).await {
            Ok(state) => Some(state.clone()),
            Err(_) => None,
        }
    }

    /// Stop polling now. No request is made after this returns.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
