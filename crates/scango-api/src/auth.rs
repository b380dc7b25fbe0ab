//! # Staff Authentication
//!
//! Cashier and guard routes sit behind [`auth_middleware`]. Shopper routes
//! and health probes do not.
//!
//! ```text
//! Authorization: Bearer {role}:{secret}      role = cashier | guard | manager
//! ```
//!
//! All staff terminals share one secret (`SCANGO_STAFF_TOKEN`); the role
//! prefix says which counter the terminal serves. With no secret configured
//! every caller is treated as `manager`.

use axum::extract::Request;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use utoipa::ToSchema;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    /// Confirms cash payment at the counter.
    Cashier,
    /// Admits shoppers at the exit.
    Guard,
    /// Covers both counters.
    Manager,
}

impl StaffRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cashier => "cashier",
            Self::Guard => "guard",
            Self::Manager => "manager",
        }
    }

    pub fn can_act_as(&self, required: StaffRole) -> bool {
        matches!(self, Self::Manager) || *self == required
    }
}

impl std::str::FromStr for StaffRole {
    type Err = AuthFailure;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cashier" => Ok(Self::Cashier),
            "guard" => Ok(Self::Guard),
            "manager" => Ok(Self::Manager),
            other => Err(AuthFailure::UnknownRole(other.to_string())),
        }
    }
}

/// Why a staff request was refused. Every variant is a 401.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthFailure {
    #[error("missing authorization header")]
    MissingHeader,
    #[error("authorization header must use the Bearer scheme")]
    NotBearer,
    #[error("staff token must look like {{role}}:{{secret}}")]
    Malformed,
    #[error("invalid staff token")]
    BadSecret,
    #[error("unknown staff role: {0}")]
    UnknownRole(String),
}

/// The terminal a staff request came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaffIdentity {
    pub role: StaffRole,
}

#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for StaffIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<StaffIdentity>()
            .copied()
            .ok_or_else(|| AppError::Unauthorized("route is not behind staff authentication".into()))
    }
}

/// 403 unless `caller` may act as `required`.
pub fn require_role(caller: &StaffIdentity, required: StaffRole) -> Result<(), AppError> {
    if caller.role.can_act_as(required) {
        return Ok(());
    }
    tracing::warn!(
        caller = caller.role.as_str(),
        required = required.as_str(),
        "staff role refused"
    );
    Err(AppError::Forbidden(format!(
        "{} terminals cannot perform {} actions",
        caller.role.as_str(),
        required.as_str()
    )))
}

/// Staff secret, placed in request extensions by the router.
#[derive(Clone, Default)]
pub struct AuthConfig {
    pub token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl AuthConfig {
    /// Resolve the caller from the `Authorization` header.
    pub fn identify(&self, headers: &HeaderMap) -> Result<StaffIdentity, AuthFailure> {
        let Some(secret) = &self.token else {
            return Ok(StaffIdentity {
                role: StaffRole::Manager,
            });
        };
        let value = headers
            .get(header::AUTHORIZATION)
            .ok_or(AuthFailure::MissingHeader)?
            .to_str()
            .map_err(|_| AuthFailure::Malformed)?;
        let presented = value.strip_prefix("Bearer ").ok_or(AuthFailure::NotBearer)?;
        check_token(presented, secret)
    }
}

/// Check `{role}:{secret}` against the configured secret. The secret is
/// compared first, so a bad role never reveals whether the secret was right
/// unless it was.
pub fn check_token(presented: &str, secret: &str) -> Result<StaffIdentity, AuthFailure> {
    let (role, given) = presented.split_once(':').ok_or(AuthFailure::Malformed)?;
    if !secrets_match(given.as_bytes(), secret.as_bytes()) {
        return Err(AuthFailure::BadSecret);
    }
    Ok(StaffIdentity {
        role: role.parse()?,
    })
}

fn secrets_match(given: &[u8], expected: &[u8]) -> bool {
    given.len() == expected.len() && bool::from(given.ct_eq(expected))
}

/// Authenticate the request and attach its [`StaffIdentity`].
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let config = request
        .extensions()
        .get::<AuthConfig>()
        .cloned()
        .unwrap_or_default();

    match config.identify(request.headers()) {
        Ok(identity) => {
            tracing::debug!(role = identity.role.as_str(), "staff request authenticated");
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(failure) => {
            tracing::warn!(
                path = %request.uri().path(),
                reason = %failure,
                "staff request refused"
            );
            AppError::Unauthorized(failure.to_string()).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::middleware::from_fn;
    use axum::routing::post;
    use axum::Router;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    const SECRET: &str = "door-7";

    async fn exit_desk(identity: StaffIdentity) -> Result<&'static str, AppError> {
        require_role(&identity, StaffRole::Guard)?;
        Ok("admitted")
    }

    fn exit_router(token: Option<&str>) -> Router {
        Router::new()
            .route("/exit", post(exit_desk))
            .layer(from_fn(auth_middleware))
            .layer(axum::Extension(AuthConfig {
                token: token.map(str::to_string),
            }))
    }

    async fn post_exit(token: Option<&str>, authorization: Option<&str>) -> (StatusCode, String) {
        let mut req = Request::post("/exit");
        if let Some(value) = authorization {
            req = req.header("authorization", value);
        }
        let resp = exit_router(token)
            .oneshot(req.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    #[tokio::test]
    async fn guard_and_manager_may_admit() {
        for role in ["guard", "manager"] {
            let header = format!("Bearer {role}:{SECRET}");
            let (status, body) = post_exit(Some(SECRET), Some(&header)).await;
            assert_eq!(status, StatusCode::OK, "{role}");
            assert_eq!(body, "admitted");
        }
    }

    #[tokio::test]
    async fn cashier_is_forbidden_at_the_exit() {
        let header = format!("Bearer cashier:{SECRET}");
        let (status, body) = post_exit(Some(SECRET), Some(&header)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body.contains("FORBIDDEN"));
    }

    #[tokio::test]
    async fn refused_requests_are_401() {
        let cases = [
            (None, "missing authorization"),
            (Some("Bearer guard:door-8"), "invalid staff token"),
            (Some("Basic Z3VhcmQ6ZG9vci03"), "Bearer"),
            (Some("Bearer door-7"), "{role}:{secret}"),
        ];
        for (header, expected) in cases {
            let (status, body) = post_exit(Some(SECRET), header).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{header:?}");
            assert!(body.contains("UNAUTHORIZED"));
            assert!(body.contains(expected), "{header:?}: {body}");
        }
    }

    #[tokio::test]
    async fn no_secret_means_manager() {
        let (status, _) = post_exit(None, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[test]
    fn role_is_checked_after_secret() {
        assert_eq!(
            check_token("janitor:door-7", SECRET),
            Err(AuthFailure::UnknownRole("janitor".into()))
        );
        assert_eq!(check_token("janitor:door-8", SECRET), Err(AuthFailure::BadSecret));
        assert_eq!(check_token("guard:door", SECRET), Err(AuthFailure::BadSecret));
    }

    #[test]
    fn secret_may_contain_colons() {
        let id = check_token("cashier:a:b:c", "a:b:c").unwrap();
        assert_eq!(id.role, StaffRole::Cashier);
    }

    #[test]
    fn manager_covers_both_counters() {
        assert!(StaffRole::Manager.can_act_as(StaffRole::Cashier));
        assert!(StaffRole::Manager.can_act_as(StaffRole::Guard));
        assert!(!StaffRole::Cashier.can_act_as(StaffRole::Guard));
        assert!(!StaffRole::Guard.can_act_as(StaffRole::Cashier));
        assert!(!StaffRole::Guard.can_act_as(StaffRole::Manager));
    }

    #[test]
    fn debug_hides_secret() {
        let cfg = AuthConfig {
            token: Some("door-7".into()),
        };
        assert!(!format!("{cfg:?}").contains("door-7"));
    }
}
