//! # scango-reward — Loyalty Reward Pipeline
//!
//! Computes loyalty-token entitlement for a checked-out order and issues it
//! exactly once, keyed by order hash, without ever gating the checkout.
//!
//! - [`compute_reward`]: the entitlement formula.
//! - [`RewardEngine`]: credit-once then mint, with an optional durable
//!   [`RewardJournal`].
//! - [`spawn_reward_worker`]: a bounded queue drained by one background task.
//!   Checkout submits with [`RewardQueue::submit`] and moves on.

pub mod compute;
pub mod engine;
pub mod worker;

pub use compute::compute_reward;
pub use engine::{RewardEngine, RewardJob, RewardJournal, RewardOutcome, RewardStats};
pub use worker::{spawn_reward_worker, RewardQueue, RewardQueueError};
