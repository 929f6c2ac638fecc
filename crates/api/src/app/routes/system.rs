use axum::{http::StatusCode, response::IntoResponse, Json};

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(
    axum::extract::Extension(tenant): axum::extract::Extension<crate::context::TenantContext>,
    axum::extract::Extension(actor): axum::extract::Extension<crate::context::ActorContext>,
) -> impl IntoResponse {
    Json(serde_json::json!({
        "tenant_id": tenant.tenant_id().to_string(),
        "actor_id": actor.actor_id().to_string(),
    }))
}
