//! # API Errors
//!
//! [`AppError`] is what every handler returns on failure. It renders as
//!
//! ```json
//! {"error": {"code": "NOT_FOUND", "message": "receipt RCP-123456 not found"}}
//! ```
//!
//! Ledger, state-machine, and identifier errors convert into it with `?`.
//! A 500 is logged with its cause; the client only sees a generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use scango_core::ValidationError;
use scango_ledger::LedgerError;
use scango_state::TransitionError;

/// Wire envelope for every error response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    #[serde(rename = "VALIDATION_ERROR")]
    Validation,
    BadRequest,
    Unauthorized,
    Forbidden,
    Conflict,
    ServiceUnavailable,
    #[serde(rename = "INTERNAL_ERROR")]
    Internal,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Conflict => StatusCode::CONFLICT,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Unknown receipt or order.
    #[error("{0}")]
    NotFound(String),
    /// Well-formed request naming something malformed or mismatched, such
    /// as a bad wallet address or an order hash for the wrong receipt.
    #[error("{0}")]
    Validation(String),
    /// Unparsable body or a checkout that breaks the input rules.
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    /// The receipt is not in a state that allows the action.
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    ServiceUnavailable(String),
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::Validation(_) => ErrorCode::Validation,
            Self::BadRequest(_) => ErrorCode::BadRequest,
            Self::Unauthorized(_) => ErrorCode::Unauthorized,
            Self::Forbidden(_) => ErrorCode::Forbidden,
            Self::Conflict(_) => ErrorCode::Conflict,
            Self::ServiceUnavailable(_) => ErrorCode::ServiceUnavailable,
            Self::Internal(_) => ErrorCode::Internal,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let message = if let Self::Internal(cause) = &self {
            tracing::error!(cause = %cause, "request failed with internal error");
            "internal error".to_string()
        } else {
            self.to_string()
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code,
                message,
                details: None,
            },
        };
        (code.status(), Json(body)).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<TransitionError> for AppError {
    fn from(err: TransitionError) -> Self {
        Self::Conflict(err.to_string())
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NotFound(key) => Self::NotFound(format!("receipt {key} not found")),
            LedgerError::InvalidTransition(e) => e.into(),
            dup @ (LedgerError::DuplicateReceipt(_) | LedgerError::DuplicateOrderHash(_)) => {
                Self::Conflict(dup.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use scango_core::{OrderHash, ReceiptStatus};

    async fn render(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn codes_serialize_to_wire_names() {
        let names: Vec<_> = [
            ErrorCode::NotFound,
            ErrorCode::Validation,
            ErrorCode::BadRequest,
            ErrorCode::Internal,
        ]
        .iter()
        .map(|c| serde_json::to_value(c).unwrap())
        .collect();
        assert_eq!(
            names,
            vec!["NOT_FOUND", "VALIDATION_ERROR", "BAD_REQUEST", "INTERNAL_ERROR"]
        );
    }

    #[tokio::test]
    async fn unknown_receipt_renders_404() {
        let (status, body) =
            render(LedgerError::NotFound("RCP-123456".into()).into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
        assert_eq!(body["error"]["message"], "receipt RCP-123456 not found");
        assert!(body["error"].get("details").is_none());
    }

    #[tokio::test]
    async fn internal_cause_is_not_leaked() {
        let (status, body) = render(AppError::Internal("pool timed out".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
        assert!(!body.to_string().contains("pool timed out"));
    }

    #[test]
    fn backwards_transition_is_conflict() {
        let err = AppError::from(LedgerError::InvalidTransition(
            TransitionError::InvalidTransition {
                from: ReceiptStatus::Verified,
                to: ReceiptStatus::Paid,
            },
        ));
        assert_eq!(err.code(), ErrorCode::Conflict);
        assert_eq!(err.code().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn duplicate_order_hash_is_conflict() {
        let err = AppError::from(LedgerError::DuplicateOrderHash(OrderHash::from_digest(&[1; 32])));
        assert_eq!(err.code(), ErrorCode::Conflict);
    }

    #[test]
    fn bad_wallet_is_validation_error() {
        let err = AppError::from(ValidationError::InvalidWalletAddress("0x12".into()));
        assert_eq!(err.code().status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(err.to_string().contains("0x12"));
    }
}
