//! Stock lots (batches) and the lot generator.
//!
//! A lot is a traceable quantity of one product received under one purchase
//! order, inspected and returned as a unit. Lots are entities inside the
//! purchase-order aggregate; they are never addressed outside of it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use lotgate_catalog::ProductId;
use lotgate_core::{DomainError, DomainResult, Entity};

use crate::order::{OrderItem, PurchaseOrderId};
use crate::qc::{LotQcStatus, QcRecord};

/// Human-readable batch identifier, unique per (product, order).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchNumber(String);

impl BatchNumber {
    pub fn new(value: impl Into<String>) -> DomainResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(DomainError::validation("batch number cannot be empty"));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for BatchNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stock lot identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LotId(Uuid);

impl LotId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for LotId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for LotId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// One received batch of one product.
///
/// `quantity` is immutable after creation; `remaining_quantity` is decremented
/// only by returns (sale consumption is out of scope here). Invariant:
/// `0 <= remaining_quantity <= quantity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLot {
    pub id: LotId,
    pub purchase_order_id: PurchaseOrderId,
    pub product_id: ProductId,
    pub batch_number: BatchNumber,
    pub barcode: String,
    pub quantity: i64,
    pub remaining_quantity: i64,
    /// Units shipped back to the supplier so far.
    pub returned_quantity: i64,
    /// Cost per unit in minor currency units.
    pub cost_price: u64,
    pub sale_price: Option<u64>,
    pub expiry_date: Option<NaiveDate>,
    pub qc_status: LotQcStatus,
    /// Current inspection record, if the lot has been inspected.
    pub qc_record: Option<QcRecord>,
    pub is_active: bool,
    pub is_returned: bool,
    pub close_reason: Option<String>,
}

impl Entity for StockLot {
    type Id = LotId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl StockLot {
    /// Evolve the lot with an accepted QC record. Decision checks live in the
    /// aggregate's command handler; this only records validated facts.
    pub(crate) fn record_qc(&mut self, record: QcRecord, expiry_date: Option<NaiveDate>) {
        if expiry_date.is_some() {
            self.expiry_date = expiry_date;
        }
        self.qc_status = record.status;
        self.qc_record = Some(record);
    }

    /// Evolve the lot with an accepted return of `quantity` units.
    pub(crate) fn record_return(&mut self, quantity: i64) {
        self.remaining_quantity -= quantity;
        self.returned_quantity += quantity;
        if self.remaining_quantity == 0 {
            self.is_returned = true;
        }
    }

    pub(crate) fn close(&mut self, reason: String) {
        self.is_active = false;
        self.close_reason = Some(reason);
    }

    /// Units that failed QC and have not been returned yet.
    pub fn outstanding_failed_quantity(&self) -> i64 {
        match &self.qc_record {
            Some(record) => (record.failed_quantity - self.returned_quantity).max(0),
            None => 0,
        }
    }

    /// A failing lot counts as returned in full once every failed unit went
    /// back to the supplier.
    pub fn is_fully_returned_for_failures(&self) -> bool {
        match &self.qc_record {
            Some(record) => {
                record.status.has_failure() && self.returned_quantity >= record.failed_quantity
            }
            None => false,
        }
    }
}

/// Lot generator: exactly one stock lot per order item.
///
/// Each lot starts with `remaining_quantity == quantity`, QC pending and
/// active. A batch-number collision within (product, order) is a fatal
/// input-validation error; nothing is generated.
pub fn generate_lots(
    purchase_order_id: PurchaseOrderId,
    items: &[OrderItem],
) -> DomainResult<Vec<StockLot>> {
    if items.is_empty() {
        return Err(DomainError::validation("order must contain at least one item"));
    }

    let mut seen: Vec<(ProductId, &BatchNumber)> = Vec::with_capacity(items.len());
    let mut lots = Vec::with_capacity(items.len());

    for item in items {
        if item.quantity <= 0 {
            return Err(DomainError::validation(format!(
                "item quantity must be positive (batch {})",
                item.batch_number
            )));
        }

        if seen
            .iter()
            .any(|(p, b)| *p == item.product_id && **b == item.batch_number)
        {
            return Err(DomainError::validation(format!(
                "duplicate batch number {} for product {}",
                item.batch_number, item.product_id
            )));
        }
        seen.push((item.product_id, &item.batch_number));

        lots.push(StockLot {
            id: LotId::new(),
            purchase_order_id,
            product_id: item.product_id,
            batch_number: item.batch_number.clone(),
            barcode: item.barcode.clone(),
            quantity: item.quantity,
            remaining_quantity: item.quantity,
            returned_quantity: 0,
            cost_price: item.cost_price,
            sale_price: item.sale_price,
            expiry_date: item.expiry_date_hint,
            qc_status: LotQcStatus::Pending,
            qc_record: None,
            is_active: true,
            is_returned: false,
            close_reason: None,
        });
    }

    Ok(lots)
}
