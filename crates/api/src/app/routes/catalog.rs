use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};

use lotgate_catalog::{AttachmentStore, ProductId, ProductRef, SupplierId, WarehouseId};
use lotgate_core::AggregateId;

use crate::app::{dto, errors};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/suppliers", post(create_supplier))
        .route("/warehouses", post(create_warehouse))
        .route("/products", post(create_product))
        .route("/attachments", post(upload_attachment))
}

pub async fn create_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
) -> axum::response::Response {
    let supplier_id = SupplierId::new(AggregateId::new());
    services.catalog.add_supplier(tenant.tenant_id(), supplier_id);
    (
        StatusCode::CREATED,
        Json(serde_json::json!({ "id": supplier_id.to_string() })),
    )
        .into_response()
}

pub async fn create_warehouse(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
) -> axum::response::Response {
    let warehouse_id = WarehouseId::new(AggregateId::new());
    services.catalog.add_warehouse(tenant.tenant_id(), warehouse_id);
    (
        StatusCode::CREATED,
        Json(serde_json::json!({ "id": warehouse_id.to_string() })),
    )
        .into_response()
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
    Json(body): Json<dto::CreateProductRequest>,
) -> axum::response::Response {
    if body.name.trim().is_empty() {
        return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", "name cannot be empty");
    }

    let product_id = ProductId::new(AggregateId::new());
    services.catalog.add_product(
        tenant.tenant_id(),
        ProductRef {
            id: product_id,
            name: body.name,
            barcode: body.barcode,
        },
    );
    (
        StatusCode::CREATED,
        Json(serde_json::json!({ "id": product_id.to_string() })),
    )
        .into_response()
}

pub async fn upload_attachment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
    Json(body): Json<dto::UploadAttachmentRequest>,
) -> axum::response::Response {
    match services.attachments.store(
        tenant.tenant_id(),
        &body.filename,
        body.content.into_bytes(),
    ) {
        Ok(reference) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "ref": reference.to_string() })),
        )
            .into_response(),
        Err(e) => errors::json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "attachment_error",
            e.to_string(),
        ),
    }
}
