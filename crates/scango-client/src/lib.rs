//! # scango-client -- Typed Rust client for the ScanGo API
//!
//! Used by shopper devices, staff terminals, and the `scango` CLI.
//!
//! - [`ScanGoClient`]: one method per API route, typed request and response
//!   bodies, structured [`ClientError`]s.
//! - [`poller::StatusPoller`]: re-reads a receipt's status on a fixed
//!   interval until the guard has verified it, publishing each observation
//!   on a `watch` channel.

pub mod client;
pub mod config;
pub mod error;
pub mod poller;
pub mod types;

pub use client::ScanGoClient;
pub use config::ClientConfig;
pub use error::ClientError;
pub use poller::{PollState, PollerConfig, PollerHandle, StatusPoller, StatusSource};
