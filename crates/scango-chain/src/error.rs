//! Chain client error types.

use scango_core::ValidationError;

/// Errors from ledger calls.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// HTTP transport error after retries.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// Gateway returned a non-2xx status.
    #[error("ledger gateway {endpoint} returned {status}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// Response deserialization failed.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The operation exceeded its deadline.
    #[error("{endpoint} did not complete within {after_ms}ms")]
    Timeout { endpoint: String, after_ms: u64 },
    /// The ledger is unreachable.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
    /// The ledger refused the write.
    #[error("ledger rejected {endpoint}: {reason}")]
    Rejected { endpoint: String, reason: String },
    /// Request failed local validation; nothing was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),
}

impl ChainError {
    /// Failures worth retrying on a later reconciliation tick.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http { .. } | Self::Timeout { .. } | Self::Unavailable(_) => true,
            Self::Api { status, .. } => *status >= 500,
            Self::Deserialization { .. }
            | Self::Rejected { .. }
            | Self::Validation(_)
            | Self::Config(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(ChainError::Unavailable("down".into()).is_transient());
        assert!(ChainError::Timeout {
            endpoint: "POST /v1/orders".into(),
            after_ms: 10
        }
        .is_transient());
        assert!(ChainError::Api {
            endpoint: "x".into(),
            status: 503,
            body: String::new()
        }
        .is_transient());
        assert!(!ChainError::Api {
            endpoint: "x".into(),
            status: 409,
            body: String::new()
        }
        .is_transient());
        assert!(!ChainError::Validation(ValidationError::NonPositiveRewardAmount).is_transient());
    }
}
