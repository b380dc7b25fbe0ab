//! Background reward worker.
//!
//! Producers hand jobs to a bounded `mpsc` queue with `try_send` and return
//! immediately. A single task drains the queue through the [`RewardEngine`].
//! A full queue drops the job with a warning; the request path is never
//! delayed by reward processing.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::engine::{RewardEngine, RewardJob};

/// Errors from [`RewardQueue::submit`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RewardQueueError {
    #[error("reward queue is full")]
    Full,
    #[error("reward worker has stopped")]
    Closed,
}

/// Cloneable handle for submitting reward jobs.
#[derive(Debug, Clone)]
pub struct RewardQueue {
    tx: mpsc::Sender<RewardJob>,
}

impl RewardQueue {
    /// Enqueue without waiting. Never blocks.
    pub fn submit(&self, job: RewardJob) -> Result<(), RewardQueueError> {
        self.tx.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(job) => {
                tracing::warn!(order_hash = %job.order_hash, "reward queue full, job dropped");
                RewardQueueError::Full
            }
            mpsc::error::TrySendError::Closed(job) => {
                tracing::warn!(order_hash = %job.order_hash, "reward worker stopped, job dropped");
                RewardQueueError::Closed
            }
        })
    }

    /// Jobs waiting to be processed.
    pub fn pending(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }
}

/// Start the worker. It runs until `shutdown` turns `true` (or its sender is
/// dropped) or every [`RewardQueue`] clone is dropped. Jobs already queued at
/// shutdown are processed before the task exits.
pub fn spawn_reward_worker(
    engine: Arc<RewardEngine>,
    capacity: usize,
    mut shutdown: watch::Receiver<bool>,
) -> (RewardQueue, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<RewardJob>(capacity.max(1));

    let handle = tokio::spawn(async move {
        tracing::info!(capacity, "reward worker started");
        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                job = rx.recv() => match job {
                    Some(job) => {
                        engine.process(job).await;
                    }
                    None => {
                        tracing::info!("reward queue closed, worker exiting");
                        return;
                    }
                },
            }
        }

        rx.close();
        let mut drained = 0usize;
        while let Ok(job) = rx.try_recv() {
            engine.process(job).await;
            drained += 1;
        }
        tracing::info!(drained, "reward worker stopped");
    });

    (RewardQueue { tx }, handle)
}
