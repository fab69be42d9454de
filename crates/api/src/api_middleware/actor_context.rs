//! Actor context extraction. Identity verification itself (JWT signature,
//! expiry, MFA) is an upstream identity provider's job; this middleware
//! only decodes the already-verified claims that provider attaches to the
//! request so handlers can check capabilities and stamp audit entries. It
//! mirrors `tenant_context.rs`'s unverified-decode approach - the security
//! boundary is the reverse proxy in front of this service, not this code.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::{request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use hinschg_domain::Role;
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
pub struct ActorContext {
    pub user_id: Uuid,
    pub role: Role,
}

#[async_trait]
impl<S> FromRequestParts<S> for ActorContext
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<ActorContext>().copied().ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Authentication required" })),
            )
        })
    }
}

pub async fn actor_context_middleware(headers: HeaderMap, mut req: Request, next: Next) -> Response {
    match extract_actor_context(&headers) {
        Some(actor) => {
            req.extensions_mut().insert(actor);
        }
        None => {
            warn!("request carries no resolvable actor identity");
        }
    }
    next.run(req).await
}

fn extract_actor_context(headers: &HeaderMap) -> Option<ActorContext> {
    let auth_header = headers.get("authorization")?.to_str().ok()?;
    let token = auth_header.strip_prefix("Bearer ")?;

    let mut parts = token.split('.');
    let (_header, claims_segment) = (parts.next()?, parts.next()?);

    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    let claims_bytes = URL_SAFE_NO_PAD.decode(claims_segment).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&claims_bytes).ok()?;

    let user_id = claims.get("sub").and_then(|v| v.as_str()).and_then(|s| Uuid::parse_str(s).ok())?;
    let role: Role = claims.get("role").cloned().and_then(|v| serde_json::from_value(v).ok())?;

    Some(ActorContext { user_id, role })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_authorization_header_yields_no_actor() {
        assert!(extract_actor_context(&HeaderMap::new()).is_none());
    }
}
