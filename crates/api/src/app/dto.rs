use chrono::NaiveDate;
use serde::Deserialize;

use lotgate_infra::projections::receiving::PurchaseOrderReadModel;

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub order_number: String,
    pub supplier_id: String,
    pub warehouse_id: String,
    #[serde(default)]
    pub invoice_number: Option<String>,
    pub items: Vec<OrderItemRequest>,
}

#[derive(Debug, Deserialize)]
pub struct OrderItemRequest {
    pub product_id: String,
    pub quantity: i64,
    pub cost_price: u64,
    #[serde(default)]
    pub sale_price: Option<u64>,
    #[serde(default)]
    pub threshold: i64,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    pub batch_number: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmitQcRequest {
    pub batch_number: String,
    pub failed_quantity: i64,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    /// References previously obtained from the attachments endpoint.
    #[serde(default)]
    pub attachments: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReturnItemRequest {
    pub batch_number: String,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct CloseLotRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub barcode: String,
}

#[derive(Debug, Deserialize)]
pub struct UploadAttachmentRequest {
    pub filename: String,
    pub content: String,
}

pub fn order_to_json(rm: PurchaseOrderReadModel) -> serde_json::Value {
    serde_json::json!({
        "id": rm.order_id.to_string(),
        "order_number": rm.order_number,
        "supplier_id": rm.supplier_id.to_string(),
        "warehouse_id": rm.warehouse_id.to_string(),
        "invoice_number": rm.invoice_number,
        "status": rm.status,
        "qc_status": rm.qc_status,
        "lots": rm.lots,
    })
}
