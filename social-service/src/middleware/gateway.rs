//! Request authorization gateway.
//!
//! Runs on every routed request before the handler:
//!
//! 1. Strip client-supplied claim headers.
//! 2. Read `Authorization: Bearer <token>`; a missing or undecodable token
//!    means the caller is `unauthorized`.
//! 3. For a decoded token, load the named session. A failed lookup or an
//!    inactive session is rejected with 401.
//! 4. Ask the policy engine about `(role, route template, method)`. A deny
//!    or an engine error is rejected with 403.
//! 5. Admitted requests carry the [`Claims`] as an extension and as the
//!    `sub`, `user_role`, `user_type`, `platform` and `session_id` headers.

use axum::{
    extract::{MatchedPath, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use service_core::error::AppError;
use std::sync::Arc;

use crate::services::{Claims, JwtService, PolicyEngine, SessionStore};

/// Role of a caller without a valid credential.
pub const UNAUTHORIZED_ROLE: &str = "unauthorized";

/// Headers carrying the decoded claims downstream.
pub const CLAIM_HEADERS: [&str; 5] = ["sub", "user_role", "user_type", "platform", "session_id"];

#[derive(Clone)]
pub struct AuthGateway {
    jwt: JwtService,
    sessions: Arc<dyn SessionStore>,
    policy: Arc<dyn PolicyEngine>,
}

impl AuthGateway {
    pub fn new(
        jwt: JwtService,
        sessions: Arc<dyn SessionStore>,
        policy: Arc<dyn PolicyEngine>,
    ) -> Self {
        Self {
            jwt,
            sessions,
            policy,
        }
    }

    /// Admit or reject one request. `Ok(None)` admits an anonymous caller.
    pub async fn authorize(
        &self,
        headers: &HeaderMap,
        resource: &str,
        action: &str,
    ) -> Result<Option<Claims>, AppError> {
        let claims = headers
            .typed_get::<Authorization<Bearer>>()
            .and_then(|auth| match self.jwt.parse(auth.token()) {
                Ok(claims) => Some(claims),
                Err(e) => {
                    tracing::debug!(error = %e, "Credential rejected, continuing as unauthorized");
                    None
                }
            });

        let role = match &claims {
            Some(claims) => {
                self.check_session(claims).await?;
                claims.user_role.clone()
            }
            None => UNAUTHORIZED_ROLE.to_string(),
        };

        match self.policy.enforce(&role, resource, action) {
            Ok(true) => Ok(claims),
            Ok(false) => {
                tracing::warn!(%role, %resource, %action, "Request denied by policy");
                Err(AppError::Forbidden(anyhow::anyhow!(
                    "Permission denied for {} {}",
                    action,
                    resource
                )))
            }
            Err(e) => {
                tracing::error!(error = %e, %role, %resource, %action, "Policy evaluation failed");
                Err(AppError::Forbidden(anyhow::anyhow!("Permission denied")))
            }
        }
    }

    async fn check_session(&self, claims: &Claims) -> Result<(), AppError> {
        let session = self
            .sessions
            .get_session(claims.session_id)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, session_id = %claims.session_id, "Session lookup failed");
                AppError::Unauthorized(anyhow::anyhow!("Session is not valid"))
            })?;

        if !session.is_active {
            tracing::warn!(session_id = %session.id, "Inactive session presented");
            return Err(AppError::Unauthorized(anyhow::anyhow!("Session is not active")));
        }
        Ok(())
    }
}

pub async fn gateway_middleware(
    State(gateway): State<AuthGateway>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    for name in CLAIM_HEADERS {
        req.headers_mut().remove(name);
    }

    let resource = req
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| req.uri().path().to_owned());
    let action = req.method().as_str().to_owned();

    if let Some(claims) = gateway.authorize(req.headers(), &resource, &action).await? {
        propagate_claims(req.headers_mut(), &claims);
        req.extensions_mut().insert(claims);
    }

    Ok(next.run(req).await)
}

fn propagate_claims(headers: &mut HeaderMap, claims: &Claims) {
    let values = [
        claims.sub.to_string(),
        claims.user_role.clone(),
        claims.user_type.clone(),
        claims.platform.clone(),
        claims.session_id.to_string(),
    ];
    for (name, value) in CLAIM_HEADERS.into_iter().zip(values) {
        // Claims that are not valid header values still travel in the extension.
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(HeaderName::from_static(name), value);
        }
    }
}
