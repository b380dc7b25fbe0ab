//! # Request Body Helpers
//!
//! Handlers take `Result<Json<T>, JsonRejection>` so that a body axum cannot
//! parse is answered in the API's `{"error": ...}` shape rather than as
//! plain text.

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::error::AppError;

/// Checkout-style business rules that serde cannot express.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

/// Unwrap a parsed body. Parse failures become 400 `BAD_REQUEST`.
pub fn extract_json<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            tracing::debug!(status = %rejection.status(), "request body rejected");
            Err(AppError::BadRequest(rejection.body_text()))
        }
    }
}

/// [`extract_json`] followed by [`Validate`]. A rule violation is reported
/// exactly like a missing field.
pub fn extract_validated_json<T: Validate>(
    body: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(body)?;
    if let Err(reason) = value.validate() {
        return Err(AppError::BadRequest(reason));
    }
    Ok(value)
}
