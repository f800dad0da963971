use axum::{
    extract::FromRequestParts,
    http::{header::USER_AGENT, request::Parts},
};
use service_core::{error::AppError, middleware::rate_limit::client_ip};
use uuid::Uuid;

use crate::{
    models::user_type,
    services::{Claims, ClientInfo},
};

/// Claims of the authenticated caller, as admitted by the gateway.
///
/// Rejects with 401 on routes the policy opens to anonymous callers.
#[derive(Debug, Clone)]
pub struct Caller(pub Claims);

impl Caller {
    pub fn id(&self) -> Uuid {
        self.0.sub
    }

    /// Regular accounts only ever act on their own records.
    pub fn is_user(&self) -> bool {
        self.0.user_type == user_type::USER
    }

    /// `requested` for administrators, the caller's own id otherwise.
    pub fn scope(&self, requested: Uuid) -> Uuid {
        if self.is_user() {
            self.id()
        } else {
            requested
        }
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(Caller)
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Authentication required")))
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ip_address = client_ip(&parts.headers, &parts.extensions)
            .map(|ip| ip.to_string())
            .unwrap_or_default();
        let user_agent = parts
            .headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        Ok(ClientInfo {
            ip_address,
            user_agent,
        })
    }
}
