use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;

use lotgate_catalog::{AttachmentRef, CatalogDirectory, ProductId, SupplierId, WarehouseId};
use lotgate_core::AggregateId;
use lotgate_receiving::{
    BatchNumber, CancelOrder, CloseLot, ConfirmOrder, CreateOrder, FinalizeQc, OrderItem,
    OrderStatus, PurchaseOrder, PurchaseOrderCommand, PurchaseOrderId, ReturnItem, ReturnOrder,
    SubmitQc,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

const AGGREGATE_TYPE: &str = "receiving.purchase_order";

pub fn router() -> Router {
    Router::new().nest("/orders", orders_router())
}

fn orders_router() -> Router {
    Router::new()
        .route("/", post(create_order).get(list_orders))
        .route("/:id", get(get_order))
        .route("/:id/confirm", post(confirm_order))
        .route("/:id/cancel", post(cancel_order))
        .route("/:id/qc", post(submit_qc))
        .route("/:id/qc/finalize", post(finalize_qc))
        .route("/:id/returns/items", post(return_item))
        .route("/:id/returns", post(return_order))
        .route("/:id/lots/:batch/close", post(close_lot))
}

fn parse_order_id(id: &str) -> Result<PurchaseOrderId, axum::response::Response> {
    id.parse::<AggregateId>()
        .map(PurchaseOrderId::new)
        .map_err(|_| {
            errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid purchase order id")
        })
}

fn parse_batch(batch: &str) -> Result<BatchNumber, axum::response::Response> {
    BatchNumber::new(batch).map_err(|e| {
        errors::json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string())
    })
}

fn dispatch_order_command(
    services: &AppServices,
    tenant: &crate::context::TenantContext,
    order_id: PurchaseOrderId,
    cmd: PurchaseOrderCommand,
) -> axum::response::Response {
    match services.dispatch::<PurchaseOrder>(
        tenant.tenant_id(),
        order_id.0,
        AGGREGATE_TYPE,
        cmd,
        |_t, aggregate_id| PurchaseOrder::empty(PurchaseOrderId::new(aggregate_id)),
    ) {
        Ok(committed) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "id": order_id.to_string(),
                "events_committed": committed.len(),
            })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn create_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
    Json(body): Json<dto::CreateOrderRequest>,
) -> axum::response::Response {
    let supplier_agg: AggregateId = match body.supplier_id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid supplier_id")
        }
    };
    let supplier_id = SupplierId::new(supplier_agg);
    if !services.catalog.supplier_exists(tenant.tenant_id(), supplier_id) {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "unknown supplier");
    }

    let warehouse_agg: AggregateId = match body.warehouse_id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid warehouse_id")
        }
    };
    let warehouse_id = WarehouseId::new(warehouse_agg);
    if !services.catalog.warehouse_exists(tenant.tenant_id(), warehouse_id) {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "unknown warehouse");
    }

    // Resolve each product against the catalog; display fields are copied
    // onto the order so the read side never needs a catalog join.
    let mut items = Vec::with_capacity(body.items.len());
    for item in body.items {
        let product_agg: AggregateId = match item.product_id.parse() {
            Ok(v) => v,
            Err(_) => {
                return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product_id")
            }
        };
        let product_id = ProductId::new(product_agg);
        let product = match services.catalog.product(tenant.tenant_id(), product_id) {
            Some(p) => p,
            None => {
                return errors::json_error(
                    StatusCode::NOT_FOUND,
                    "not_found",
                    format!("unknown product {product_id}"),
                )
            }
        };
        let batch_number = match parse_batch(&item.batch_number) {
            Ok(b) => b,
            Err(resp) => return resp,
        };

        items.push(OrderItem {
            product_id,
            product_name: product.name,
            barcode: product.barcode,
            quantity: item.quantity,
            cost_price: item.cost_price,
            sale_price: item.sale_price,
            threshold: item.threshold,
            expiry_date_hint: item.expiry_date,
            batch_number,
        });
    }

    let order_id = PurchaseOrderId::new(AggregateId::new());
    let cmd = PurchaseOrderCommand::CreateOrder(CreateOrder {
        tenant_id: tenant.tenant_id(),
        order_id,
        order_number: body.order_number,
        supplier_id,
        warehouse_id,
        invoice_number: body.invoice_number,
        items,
        occurred_at: Utc::now(),
    });

    match services.dispatch::<PurchaseOrder>(
        tenant.tenant_id(),
        order_id.0,
        AGGREGATE_TYPE,
        cmd,
        |_t, aggregate_id| PurchaseOrder::empty(PurchaseOrderId::new(aggregate_id)),
    ) {
        Ok(committed) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "id": order_id.to_string(),
                "events_committed": committed.len(),
            })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn confirm_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let cmd = PurchaseOrderCommand::ConfirmOrder(ConfirmOrder {
        tenant_id: tenant.tenant_id(),
        order_id,
        occurred_at: Utc::now(),
    });
    dispatch_order_command(&services, &tenant, order_id, cmd)
}

pub async fn cancel_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let cmd = PurchaseOrderCommand::CancelOrder(CancelOrder {
        tenant_id: tenant.tenant_id(),
        order_id,
        occurred_at: Utc::now(),
    });
    dispatch_order_command(&services, &tenant, order_id, cmd)
}

pub async fn submit_qc(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
    Extension(actor): Extension<crate::context::ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::SubmitQcRequest>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let batch_number = match parse_batch(&body.batch_number) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    let cmd = PurchaseOrderCommand::SubmitQc(SubmitQc {
        tenant_id: tenant.tenant_id(),
        order_id,
        batch_number,
        failed_quantity: body.failed_quantity,
        remarks: body.remarks,
        expiry_date: body.expiry_date,
        attachments: body.attachments.into_iter().map(AttachmentRef::new).collect(),
        inspector_id: actor.actor_id(),
        occurred_at: Utc::now(),
    });
    dispatch_order_command(&services, &tenant, order_id, cmd)
}

pub async fn finalize_qc(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let cmd = PurchaseOrderCommand::FinalizeQc(FinalizeQc {
        tenant_id: tenant.tenant_id(),
        order_id,
        occurred_at: Utc::now(),
    });
    dispatch_order_command(&services, &tenant, order_id, cmd)
}

pub async fn return_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::ReturnItemRequest>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let batch_number = match parse_batch(&body.batch_number) {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    let cmd = PurchaseOrderCommand::ReturnItem(ReturnItem {
        tenant_id: tenant.tenant_id(),
        order_id,
        batch_number,
        quantity: body.quantity,
        occurred_at: Utc::now(),
    });
    dispatch_order_command(&services, &tenant, order_id, cmd)
}

pub async fn return_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let cmd = PurchaseOrderCommand::ReturnOrder(ReturnOrder {
        tenant_id: tenant.tenant_id(),
        order_id,
        occurred_at: Utc::now(),
    });
    dispatch_order_command(&services, &tenant, order_id, cmd)
}

pub async fn close_lot(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
    Path((id, batch)): Path<(String, String)>,
    Json(body): Json<dto::CloseLotRequest>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let batch_number = match parse_batch(&batch) {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    let cmd = PurchaseOrderCommand::CloseLot(CloseLot {
        tenant_id: tenant.tenant_id(),
        order_id,
        batch_number,
        reason: body.reason,
        occurred_at: Utc::now(),
    });
    dispatch_order_command(&services, &tenant, order_id, cmd)
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.orders_get(tenant.tenant_id(), &order_id) {
        Some(rm) => (StatusCode::OK, Json(dto::order_to_json(rm))).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "purchase order not found"),
    }
}

#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<String>,
    pub supplier_id: Option<String>,
}

/// Query parameters:
/// - `status`: filter by order status (e.g. "awaiting_qc")
/// - `supplier_id`: filter by supplier (UUID)
pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
    Query(query): Query<OrderListQuery>,
) -> axum::response::Response {
    let status = match query.status {
        Some(s) => match serde_json::from_value::<OrderStatus>(serde_json::Value::String(s)) {
            Ok(status) => Some(status),
            Err(_) => {
                return errors::json_error(
                    StatusCode::BAD_REQUEST,
                    "validation",
                    "unknown order status",
                );
            }
        },
        None => None,
    };
    let supplier_id = match query.supplier_id {
        Some(s) => match s.parse::<uuid::Uuid>() {
            Ok(u) => Some(SupplierId::new(AggregateId::from_uuid(u))),
            Err(_) => {
                return errors::json_error(
                    StatusCode::BAD_REQUEST,
                    "validation",
                    "supplier_id must be a UUID",
                );
            }
        },
        None => None,
    };

    let items = services
        .orders_list(tenant.tenant_id())
        .into_iter()
        .filter(|rm| status.map_or(true, |s| rm.status == s))
        .filter(|rm| supplier_id.map_or(true, |s| rm.supplier_id == s))
        .map(dto::order_to_json)
        .collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}
