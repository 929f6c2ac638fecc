use axum::{
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use lotgate_core::{TenantId, UserId};

use crate::context::{ActorContext, TenantContext};

/// Derive tenant and actor context from request headers.
///
/// Authentication itself is out of scope for this service; an upstream
/// gateway is expected to validate credentials and inject `X-Tenant-Id` and
/// `X-Actor-Id`. Requests without a valid tenant header are rejected before
/// any handler runs.
pub async fn context_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let tenant_id = parse_header::<TenantId>(req.headers(), "x-tenant-id")?;
    let actor_id = parse_header::<UserId>(req.headers(), "x-actor-id")?;

    req.extensions_mut().insert(TenantContext::new(tenant_id));
    req.extensions_mut().insert(ActorContext::new(actor_id));

    Ok(next.run(req).await)
}

fn parse_header<T: std::str::FromStr>(
    headers: &HeaderMap,
    name: &str,
) -> Result<T, StatusCode> {
    let value = headers.get(name).ok_or(StatusCode::UNAUTHORIZED)?;
    let value = value.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;
    value.trim().parse().map_err(|_| StatusCode::UNAUTHORIZED)
}
