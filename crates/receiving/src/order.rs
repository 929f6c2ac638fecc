use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use lotgate_catalog::{AttachmentRef, ProductId, SupplierId, WarehouseId};
use lotgate_core::{Aggregate, AggregateId, AggregateRoot, DomainError, TenantId, UserId};
use lotgate_events::Event;

use crate::lot::{generate_lots, BatchNumber, StockLot};
use crate::qc::{
    inspection_progress, lot_qc_status, order_qc_rollup, InspectionProgress, LotQcStatus,
    OrderQcStatus, QcRecord,
};

/// Purchase order identifier (tenant-scoped via `tenant_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PurchaseOrderId(pub AggregateId);

impl PurchaseOrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for PurchaseOrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Purchase-order lifecycle status.
///
/// `Cancelled` and `QcFailedReturned` are terminal; no transition may leave
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    AwaitingQc,
    PartiallyInspected,
    Received,
    QcFailedPendingReturn,
    QcFailedReturned,
    QcFailedPartiallyReturned,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::QcFailedReturned)
    }

    /// States reached by a failed QC finalization, from which returns run.
    pub fn is_qc_failed(self) -> bool {
        matches!(
            self,
            OrderStatus::QcFailedPendingReturn
                | OrderStatus::QcFailedPartiallyReturned
                | OrderStatus::QcFailedReturned
        )
    }

    /// States in which per-lot QC submissions are accepted.
    fn is_open_for_inspection(self) -> bool {
        matches!(self, OrderStatus::AwaitingQc | OrderStatus::PartiallyInspected)
    }

    /// States in which return operations are accepted.
    fn is_open_for_returns(self) -> bool {
        matches!(
            self,
            OrderStatus::QcFailedPendingReturn | OrderStatus::QcFailedPartiallyReturned
        )
    }
}

/// One requested line of a purchase order. Immutable once the order is
/// confirmed (no item-mutation command exists at all in this design).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub barcode: String,
    pub quantity: i64,
    /// Cost per unit in minor currency units.
    pub cost_price: u64,
    pub sale_price: Option<u64>,
    /// Low-stock alert threshold carried onto inventory.
    pub threshold: i64,
    pub expiry_date_hint: Option<NaiveDate>,
    pub batch_number: BatchNumber,
}

/// Aggregate root: PurchaseOrder.
///
/// Owns its stock lots and their QC records; the order's `status` and
/// `qc_status` are always derived from the lots through the pure aggregation
/// functions in [`crate::qc`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseOrder {
    id: PurchaseOrderId,
    tenant_id: Option<TenantId>,
    order_number: String,
    supplier_id: Option<SupplierId>,
    warehouse_id: Option<WarehouseId>,
    invoice_number: Option<String>,
    items: Vec<OrderItem>,
    lots: Vec<StockLot>,
    status: OrderStatus,
    qc_status: OrderQcStatus,
    version: u64,
    created: bool,
}

impl PurchaseOrder {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: PurchaseOrderId) -> Self {
        Self {
            id,
            tenant_id: None,
            order_number: String::new(),
            supplier_id: None,
            warehouse_id: None,
            invoice_number: None,
            items: Vec::new(),
            lots: Vec::new(),
            status: OrderStatus::Pending,
            qc_status: OrderQcStatus::Pending,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> PurchaseOrderId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn order_number(&self) -> &str {
        &self.order_number
    }

    pub fn supplier_id(&self) -> Option<SupplierId> {
        self.supplier_id
    }

    pub fn warehouse_id(&self) -> Option<WarehouseId> {
        self.warehouse_id
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn qc_status(&self) -> OrderQcStatus {
        self.qc_status
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn lots(&self) -> &[StockLot] {
        &self.lots
    }

    pub fn lot(&self, batch_number: &BatchNumber) -> Option<&StockLot> {
        self.lots.iter().find(|l| &l.batch_number == batch_number)
    }

    fn lot_statuses(&self) -> Vec<LotQcStatus> {
        self.lots.iter().map(|l| l.qc_status).collect()
    }
}

impl AggregateRoot for PurchaseOrder {
    type Id = PurchaseOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateOrder. Generates one stock lot per item on acceptance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrder {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub order_number: String,
    pub supplier_id: SupplierId,
    pub warehouse_id: WarehouseId,
    pub invoice_number: Option<String>,
    pub items: Vec<OrderItem>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ConfirmOrder (only from `Pending`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmOrder {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CancelOrder (only from `Pending`, never after confirmation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOrder {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SubmitQc — record an inspection outcome for one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitQc {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub batch_number: BatchNumber,
    pub failed_quantity: i64,
    pub remarks: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub attachments: Vec<AttachmentRef>,
    pub inspector_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: FinalizeQc — the explicit "summarize QC" action for the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizeQc {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReturnItem — send failed units of one batch back to the supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnItem {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub batch_number: BatchNumber,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReturnOrder — close out the return flow for the whole order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnOrder {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CloseLot — administrative close with a mandatory reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseLot {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub batch_number: BatchNumber,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseOrderCommand {
    CreateOrder(CreateOrder),
    ConfirmOrder(ConfirmOrder),
    CancelOrder(CancelOrder),
    SubmitQc(SubmitQc),
    FinalizeQc(FinalizeQc),
    ReturnItem(ReturnItem),
    ReturnOrder(ReturnOrder),
    CloseLot(CloseLot),
}

/// Event: OrderCreated. Carries the generated lots so replay is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreated {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub order_number: String,
    pub supplier_id: SupplierId,
    pub warehouse_id: WarehouseId,
    pub invoice_number: Option<String>,
    pub items: Vec<OrderItem>,
    pub lots: Vec<StockLot>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderConfirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderConfirmed {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderCancelled. Lots are logically discarded with the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCancelled {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LotQcRecorded. The record becomes the lot's current QC record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotQcRecorded {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub batch_number: BatchNumber,
    pub record: QcRecord,
    pub expiry_date: Option<NaiveDate>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderQcFinalized. Carries the computed rollup and the resulting
/// lifecycle status as facts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderQcFinalized {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub qc_status: OrderQcStatus,
    pub status: OrderStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LotReturned — `quantity` units of the batch went back to the supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotReturned {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub batch_number: BatchNumber,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderReturned — the bulk return closed out with the given status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReturned {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub status: OrderStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LotClosed — administrative close, terminal for the lot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotClosed {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub batch_number: BatchNumber,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseOrderEvent {
    OrderCreated(OrderCreated),
    OrderConfirmed(OrderConfirmed),
    OrderCancelled(OrderCancelled),
    LotQcRecorded(LotQcRecorded),
    OrderQcFinalized(OrderQcFinalized),
    LotReturned(LotReturned),
    OrderReturned(OrderReturned),
    LotClosed(LotClosed),
}

impl Event for PurchaseOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PurchaseOrderEvent::OrderCreated(_) => "receiving.order.created",
            PurchaseOrderEvent::OrderConfirmed(_) => "receiving.order.confirmed",
            PurchaseOrderEvent::OrderCancelled(_) => "receiving.order.cancelled",
            PurchaseOrderEvent::LotQcRecorded(_) => "receiving.lot.qc_recorded",
            PurchaseOrderEvent::OrderQcFinalized(_) => "receiving.order.qc_finalized",
            PurchaseOrderEvent::LotReturned(_) => "receiving.lot.returned",
            PurchaseOrderEvent::OrderReturned(_) => "receiving.order.returned",
            PurchaseOrderEvent::LotClosed(_) => "receiving.lot.closed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PurchaseOrderEvent::OrderCreated(e) => e.occurred_at,
            PurchaseOrderEvent::OrderConfirmed(e) => e.occurred_at,
            PurchaseOrderEvent::OrderCancelled(e) => e.occurred_at,
            PurchaseOrderEvent::LotQcRecorded(e) => e.occurred_at,
            PurchaseOrderEvent::OrderQcFinalized(e) => e.occurred_at,
            PurchaseOrderEvent::LotReturned(e) => e.occurred_at,
            PurchaseOrderEvent::OrderReturned(e) => e.occurred_at,
            PurchaseOrderEvent::LotClosed(e) => e.occurred_at,
        }
    }
}

impl Aggregate for PurchaseOrder {
    type Command = PurchaseOrderCommand;
    type Event = PurchaseOrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PurchaseOrderEvent::OrderCreated(e) => {
                self.id = e.order_id;
                self.tenant_id = Some(e.tenant_id);
                self.order_number = e.order_number.clone();
                self.supplier_id = Some(e.supplier_id);
                self.warehouse_id = Some(e.warehouse_id);
                self.invoice_number = e.invoice_number.clone();
                self.items = e.items.clone();
                self.lots = e.lots.clone();
                self.status = OrderStatus::Pending;
                self.qc_status = OrderQcStatus::Pending;
                self.created = true;
            }
            PurchaseOrderEvent::OrderConfirmed(_) => {
                self.status = OrderStatus::AwaitingQc;
            }
            PurchaseOrderEvent::OrderCancelled(_) => {
                self.status = OrderStatus::Cancelled;
                for lot in &mut self.lots {
                    lot.is_active = false;
                }
            }
            PurchaseOrderEvent::LotQcRecorded(e) => {
                if let Some(lot) = self
                    .lots
                    .iter_mut()
                    .find(|l| l.batch_number == e.batch_number)
                {
                    lot.record_qc(e.record.clone(), e.expiry_date);
                }

                // Derived state: progress drives the lifecycle status, the
                // rollup stays pending until every lot is inspected.
                let statuses = self.lot_statuses();
                if inspection_progress(&statuses) != InspectionProgress::NotStarted {
                    self.status = OrderStatus::PartiallyInspected;
                }
                self.qc_status = match inspection_progress(&statuses) {
                    InspectionProgress::Complete => order_qc_rollup(&statuses),
                    _ => OrderQcStatus::Pending,
                };
            }
            PurchaseOrderEvent::OrderQcFinalized(e) => {
                self.qc_status = e.qc_status;
                self.status = e.status;
            }
            PurchaseOrderEvent::LotReturned(e) => {
                if let Some(lot) = self
                    .lots
                    .iter_mut()
                    .find(|l| l.batch_number == e.batch_number)
                {
                    lot.record_return(e.quantity);
                }
            }
            PurchaseOrderEvent::OrderReturned(e) => {
                self.status = e.status;
            }
            PurchaseOrderEvent::LotClosed(e) => {
                if let Some(lot) = self
                    .lots
                    .iter_mut()
                    .find(|l| l.batch_number == e.batch_number)
                {
                    lot.close(e.reason.clone());
                }
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            PurchaseOrderCommand::CreateOrder(cmd) => self.handle_create(cmd),
            PurchaseOrderCommand::ConfirmOrder(cmd) => self.handle_confirm(cmd),
            PurchaseOrderCommand::CancelOrder(cmd) => self.handle_cancel(cmd),
            PurchaseOrderCommand::SubmitQc(cmd) => self.handle_submit_qc(cmd),
            PurchaseOrderCommand::FinalizeQc(cmd) => self.handle_finalize(cmd),
            PurchaseOrderCommand::ReturnItem(cmd) => self.handle_return_item(cmd),
            PurchaseOrderCommand::ReturnOrder(cmd) => self.handle_return_order(cmd),
            PurchaseOrderCommand::CloseLot(cmd) => self.handle_close_lot(cmd),
        }
    }
}

impl PurchaseOrder {
    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        Ok(())
    }

    fn ensure_order_id(&self, order_id: PurchaseOrderId) -> Result<(), DomainError> {
        if self.id != order_id {
            return Err(DomainError::invariant("order_id mismatch"));
        }
        Ok(())
    }

    fn ensure_exists(&self, tenant_id: TenantId, order_id: PurchaseOrderId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_tenant(tenant_id)?;
        self.ensure_order_id(order_id)
    }

    fn find_lot(&self, batch_number: &BatchNumber) -> Result<&StockLot, DomainError> {
        self.lot(batch_number).ok_or(DomainError::NotFound)
    }

    fn handle_create(&self, cmd: &CreateOrder) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("purchase order already exists"));
        }
        if cmd.order_number.trim().is_empty() {
            return Err(DomainError::validation("order number cannot be empty"));
        }
        for item in &cmd.items {
            if item.product_name.trim().is_empty() {
                return Err(DomainError::validation(format!(
                    "product name cannot be empty (batch {})",
                    item.batch_number
                )));
            }
            if item.threshold < 0 {
                return Err(DomainError::validation(format!(
                    "threshold cannot be negative (batch {})",
                    item.batch_number
                )));
            }
        }

        // Lot generator: validates items and produces one lot per item.
        let lots = generate_lots(cmd.order_id, &cmd.items)?;

        Ok(vec![PurchaseOrderEvent::OrderCreated(OrderCreated {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            order_number: cmd.order_number.clone(),
            supplier_id: cmd.supplier_id,
            warehouse_id: cmd.warehouse_id,
            invoice_number: cmd.invoice_number.clone(),
            items: cmd.items.clone(),
            lots,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_confirm(&self, cmd: &ConfirmOrder) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.order_id)?;

        if self.status != OrderStatus::Pending {
            return Err(DomainError::conflict(
                "only pending purchase orders can be confirmed",
            ));
        }

        Ok(vec![PurchaseOrderEvent::OrderConfirmed(OrderConfirmed {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel(&self, cmd: &CancelOrder) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.order_id)?;

        if self.status != OrderStatus::Pending {
            return Err(DomainError::conflict(
                "only pending purchase orders can be cancelled",
            ));
        }

        Ok(vec![PurchaseOrderEvent::OrderCancelled(OrderCancelled {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_submit_qc(&self, cmd: &SubmitQc) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.order_id)?;

        if self.status == OrderStatus::Pending {
            return Err(DomainError::conflict(
                "purchase order is not confirmed yet; QC cannot start",
            ));
        }
        if !self.status.is_open_for_inspection() {
            return Err(DomainError::conflict(
                "purchase order is no longer open for inspection",
            ));
        }

        let lot = self.find_lot(&cmd.batch_number)?;
        if !lot.is_active {
            return Err(DomainError::conflict("lot is closed"));
        }
        if lot.qc_status.is_resolved() {
            return Err(DomainError::conflict(
                "QC has already been recorded for this batch",
            ));
        }

        let status = lot_qc_status(lot.quantity, cmd.failed_quantity)?;

        // A passed lot must carry an expiry date before the order can ever be
        // finalized; reject up front so no state changes.
        let effective_expiry = cmd.expiry_date.or(lot.expiry_date);
        if status == LotQcStatus::Passed && effective_expiry.is_none() {
            return Err(DomainError::validation(
                "a passed lot requires an expiry date",
            ));
        }

        let supplier_id = self
            .supplier_id
            .ok_or_else(|| DomainError::invariant("supplier must be set"))?;
        let warehouse_id = self
            .warehouse_id
            .ok_or_else(|| DomainError::invariant("warehouse must be set"))?;

        let record = QcRecord {
            id: Uuid::now_v7(),
            batch_number: cmd.batch_number.clone(),
            product_id: lot.product_id,
            supplier_id,
            warehouse_id,
            total_quantity: lot.quantity,
            failed_quantity: cmd.failed_quantity,
            status,
            remarks: cmd.remarks.clone(),
            attachments: cmd.attachments.clone(),
            inspector_id: cmd.inspector_id,
            inspection_date: cmd.occurred_at,
        };

        Ok(vec![PurchaseOrderEvent::LotQcRecorded(LotQcRecorded {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            batch_number: cmd.batch_number.clone(),
            record,
            expiry_date: cmd.expiry_date,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_finalize(&self, cmd: &FinalizeQc) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.order_id)?;

        if self.status == OrderStatus::Pending {
            return Err(DomainError::conflict(
                "purchase order is not confirmed yet; QC cannot be finalized",
            ));
        }
        if !self.status.is_open_for_inspection() {
            return Err(DomainError::conflict(
                "purchase order QC has already been finalized",
            ));
        }

        let statuses = self.lot_statuses();
        if inspection_progress(&statuses) == InspectionProgress::NotStarted {
            return Err(DomainError::conflict(
                "no lot has been inspected yet; nothing to finalize",
            ));
        }

        for lot in &self.lots {
            if lot.qc_status == LotQcStatus::Passed && lot.expiry_date.is_none() {
                return Err(DomainError::validation(format!(
                    "passed lot {} has no expiry date",
                    lot.batch_number
                )));
            }
        }

        let rollup = order_qc_rollup(&statuses);
        let status = if rollup == OrderQcStatus::Passed {
            OrderStatus::Received
        } else {
            OrderStatus::QcFailedPendingReturn
        };

        Ok(vec![PurchaseOrderEvent::OrderQcFinalized(OrderQcFinalized {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            qc_status: rollup,
            status,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_return_item(&self, cmd: &ReturnItem) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.order_id)?;

        if !self.status.is_open_for_returns() {
            return Err(DomainError::conflict(
                "purchase order is not in a returnable state",
            ));
        }

        let lot = self.find_lot(&cmd.batch_number)?;
        if lot.is_returned {
            return Err(DomainError::conflict("lot already fully returned"));
        }
        if !lot.qc_status.has_failure() {
            return Err(DomainError::conflict(
                "only lots with failed units can be returned",
            ));
        }
        if cmd.quantity <= 0 {
            return Err(DomainError::validation("return quantity must be positive"));
        }
        if cmd.quantity > lot.remaining_quantity {
            return Err(DomainError::validation(
                "return quantity exceeds remaining quantity",
            ));
        }
        if cmd.quantity > lot.outstanding_failed_quantity() {
            return Err(DomainError::validation(
                "return quantity exceeds failed quantity outstanding for this batch",
            ));
        }

        Ok(vec![PurchaseOrderEvent::LotReturned(LotReturned {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            batch_number: cmd.batch_number.clone(),
            quantity: cmd.quantity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_return_order(&self, cmd: &ReturnOrder) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.order_id)?;

        if !self.status.is_open_for_returns() {
            return Err(DomainError::conflict(
                "purchase order is not in a returnable state",
            ));
        }

        let failing: Vec<&StockLot> = self
            .lots
            .iter()
            .filter(|l| l.qc_status.has_failure())
            .collect();

        if failing.iter().all(|l| l.returned_quantity == 0) {
            return Err(DomainError::conflict(
                "no units have been returned yet; return items first",
            ));
        }

        let status = if failing.iter().all(|l| l.is_fully_returned_for_failures()) {
            OrderStatus::QcFailedReturned
        } else {
            OrderStatus::QcFailedPartiallyReturned
        };

        Ok(vec![PurchaseOrderEvent::OrderReturned(OrderReturned {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            status,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_close_lot(&self, cmd: &CloseLot) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.order_id)?;

        if cmd.reason.trim().is_empty() {
            return Err(DomainError::validation("close reason is mandatory"));
        }

        let lot = self.find_lot(&cmd.batch_number)?;
        if !lot.is_active {
            return Err(DomainError::conflict("lot is already closed"));
        }

        Ok(vec![PurchaseOrderEvent::LotClosed(LotClosed {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            batch_number: cmd.batch_number.clone(),
            reason: cmd.reason.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_tenant_id() -> TenantId {
        TenantId::new()
    }

    fn test_order_id() -> PurchaseOrderId {
        PurchaseOrderId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn test_item(batch: &str, quantity: i64) -> OrderItem {
        OrderItem {
            product_id: ProductId::new(AggregateId::new()),
            product_name: format!("product-{batch}"),
            barcode: "4006381333931".to_string(),
            quantity,
            cost_price: 500,
            sale_price: Some(900),
            threshold: 5,
            expiry_date_hint: None,
            batch_number: BatchNumber::new(batch).unwrap(),
        }
    }

    fn batch(s: &str) -> BatchNumber {
        BatchNumber::new(s).unwrap()
    }

    /// Run a command against the order and apply all resulting events.
    fn exec(order: &mut PurchaseOrder, cmd: PurchaseOrderCommand) -> Vec<PurchaseOrderEvent> {
        let events = order.handle(&cmd).unwrap();
        for e in &events {
            order.apply(e);
        }
        events
    }

    fn exec_err(order: &mut PurchaseOrder, cmd: PurchaseOrderCommand) -> DomainError {
        order.handle(&cmd).unwrap_err()
    }

    fn created_order(
        tenant_id: TenantId,
        order_id: PurchaseOrderId,
        items: Vec<OrderItem>,
    ) -> PurchaseOrder {
        let mut order = PurchaseOrder::empty(order_id);
        exec(
            &mut order,
            PurchaseOrderCommand::CreateOrder(CreateOrder {
                tenant_id,
                order_id,
                order_number: "PO-2025-0001".to_string(),
                supplier_id: SupplierId::new(AggregateId::new()),
                warehouse_id: WarehouseId::new(AggregateId::new()),
                invoice_number: Some("INV-77".to_string()),
                items,
                occurred_at: test_time(),
            }),
        );
        order
    }

    fn confirmed_order(
        tenant_id: TenantId,
        order_id: PurchaseOrderId,
        items: Vec<OrderItem>,
    ) -> PurchaseOrder {
        let mut order = created_order(tenant_id, order_id, items);
        exec(
            &mut order,
            PurchaseOrderCommand::ConfirmOrder(ConfirmOrder {
                tenant_id,
                order_id,
                occurred_at: test_time(),
            }),
        );
        order
    }

    fn submit_qc(
        order: &mut PurchaseOrder,
        tenant_id: TenantId,
        order_id: PurchaseOrderId,
        batch_number: &str,
        failed: i64,
        expiry: Option<NaiveDate>,
    ) {
        exec(
            order,
            PurchaseOrderCommand::SubmitQc(SubmitQc {
                tenant_id,
                order_id,
                batch_number: batch(batch_number),
                failed_quantity: failed,
                remarks: None,
                expiry_date: expiry,
                attachments: vec![],
                inspector_id: UserId::new(),
                occurred_at: test_time(),
            }),
        );
    }

    fn expiry() -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2027, 1, 31)
    }

    #[test]
    fn create_generates_one_lot_per_item_and_conserves_quantity() {
        let tenant_id = test_tenant_id();
        let order_id = test_order_id();
        let items = vec![test_item("B-1", 10), test_item("B-2", 4)];

        let order = created_order(tenant_id, order_id, items);

        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.qc_status(), OrderQcStatus::Pending);
        assert_eq!(order.lots().len(), order.items().len());

        let item_total: i64 = order.items().iter().map(|i| i.quantity).sum();
        let lot_total: i64 = order.lots().iter().map(|l| l.quantity).sum();
        assert_eq!(item_total, lot_total);
    }

    #[test]
    fn create_with_duplicate_batch_per_product_is_rejected() {
        let tenant_id = test_tenant_id();
        let order_id = test_order_id();
        let product_id = ProductId::new(AggregateId::new());
        let mut a = test_item("B-1", 5);
        let mut b = test_item("B-1", 7);
        a.product_id = product_id;
        b.product_id = product_id;

        let order = PurchaseOrder::empty(order_id);
        let err = order
            .handle(&PurchaseOrderCommand::CreateOrder(CreateOrder {
                tenant_id,
                order_id,
                order_number: "PO-1".to_string(),
                supplier_id: SupplierId::new(AggregateId::new()),
                warehouse_id: WarehouseId::new(AggregateId::new()),
                invoice_number: None,
                items: vec![a, b],
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn confirm_moves_pending_to_awaiting_qc() {
        let tenant_id = test_tenant_id();
        let order_id = test_order_id();
        let order = confirmed_order(tenant_id, order_id, vec![test_item("B-1", 10)]);
        assert_eq!(order.status(), OrderStatus::AwaitingQc);
    }

    #[test]
    fn cancel_after_confirm_is_a_conflict() {
        let tenant_id = test_tenant_id();
        let order_id = test_order_id();
        let mut order = confirmed_order(tenant_id, order_id, vec![test_item("B-1", 10)]);

        let err = exec_err(
            &mut order,
            PurchaseOrderCommand::CancelOrder(CancelOrder {
                tenant_id,
                order_id,
                occurred_at: test_time(),
            }),
        );
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(order.status(), OrderStatus::AwaitingQc);
    }

    #[test]
    fn cancel_from_pending_discards_lots() {
        let tenant_id = test_tenant_id();
        let order_id = test_order_id();
        let mut order = created_order(tenant_id, order_id, vec![test_item("B-1", 10)]);

        exec(
            &mut order,
            PurchaseOrderCommand::CancelOrder(CancelOrder {
                tenant_id,
                order_id,
                occurred_at: test_time(),
            }),
        );

        assert_eq!(order.status(), OrderStatus::Cancelled);
        assert!(order.lots().iter().all(|l| !l.is_active));
    }

    #[test]
    fn qc_before_confirmation_is_a_conflict() {
        let tenant_id = test_tenant_id();
        let order_id = test_order_id();
        let mut order = created_order(tenant_id, order_id, vec![test_item("B-1", 10)]);

        let err = exec_err(
            &mut order,
            PurchaseOrderCommand::SubmitQc(SubmitQc {
                tenant_id,
                order_id,
                batch_number: batch("B-1"),
                failed_quantity: 0,
                remarks: None,
                expiry_date: expiry(),
                attachments: vec![],
                inspector_id: UserId::new(),
                occurred_at: test_time(),
            }),
        );
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn passed_submission_without_expiry_is_rejected_with_no_state_change() {
        let tenant_id = test_tenant_id();
        let order_id = test_order_id();
        let mut order = confirmed_order(tenant_id, order_id, vec![test_item("B-1", 10)]);

        let err = exec_err(
            &mut order,
            PurchaseOrderCommand::SubmitQc(SubmitQc {
                tenant_id,
                order_id,
                batch_number: batch("B-1"),
                failed_quantity: 0,
                remarks: None,
                expiry_date: None,
                attachments: vec![],
                inspector_id: UserId::new(),
                occurred_at: test_time(),
            }),
        );

        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(order.lot(&batch("B-1")).unwrap().qc_status, LotQcStatus::Pending);
        assert_eq!(order.status(), OrderStatus::AwaitingQc);
    }

    #[test]
    fn failed_submission_needs_no_expiry() {
        let tenant_id = test_tenant_id();
        let order_id = test_order_id();
        let mut order = confirmed_order(tenant_id, order_id, vec![test_item("B-1", 10)]);

        submit_qc(&mut order, tenant_id, order_id, "B-1", 10, None);

        assert_eq!(order.lot(&batch("B-1")).unwrap().qc_status, LotQcStatus::Failed);
        assert_eq!(order.status(), OrderStatus::PartiallyInspected);
    }

    #[test]
    fn second_qc_submission_for_same_batch_is_a_conflict() {
        let tenant_id = test_tenant_id();
        let order_id = test_order_id();
        let mut order = confirmed_order(tenant_id, order_id, vec![test_item("B-1", 10)]);

        submit_qc(&mut order, tenant_id, order_id, "B-1", 2, None);

        let err = exec_err(
            &mut order,
            PurchaseOrderCommand::SubmitQc(SubmitQc {
                tenant_id,
                order_id,
                batch_number: batch("B-1"),
                failed_quantity: 3,
                remarks: None,
                expiry_date: None,
                attachments: vec![],
                inspector_id: UserId::new(),
                occurred_at: test_time(),
            }),
        );
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn order_qc_status_stays_pending_until_every_lot_is_inspected() {
        let tenant_id = test_tenant_id();
        let order_id = test_order_id();
        let mut order = confirmed_order(
            tenant_id,
            order_id,
            vec![test_item("B-1", 10), test_item("B-2", 6)],
        );

        submit_qc(&mut order, tenant_id, order_id, "B-1", 0, expiry());
        assert_eq!(order.qc_status(), OrderQcStatus::Pending);
        assert_eq!(order.status(), OrderStatus::PartiallyInspected);

        submit_qc(&mut order, tenant_id, order_id, "B-2", 6, None);
        assert_eq!(order.qc_status(), OrderQcStatus::PartiallyPassed);
    }

    #[test]
    fn finalize_with_no_inspected_lot_is_a_conflict() {
        let tenant_id = test_tenant_id();
        let order_id = test_order_id();
        let mut order = confirmed_order(
            tenant_id,
            order_id,
            vec![test_item("B-1", 10), test_item("B-2", 6)],
        );

        let err = exec_err(
            &mut order,
            PurchaseOrderCommand::FinalizeQc(FinalizeQc {
                tenant_id,
                order_id,
                occurred_at: test_time(),
            }),
        );
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn finalize_all_passed_receives_the_order() {
        let tenant_id = test_tenant_id();
        let order_id = test_order_id();
        let mut order = confirmed_order(
            tenant_id,
            order_id,
            vec![test_item("B-1", 10), test_item("B-2", 6)],
        );

        submit_qc(&mut order, tenant_id, order_id, "B-1", 0, expiry());
        submit_qc(&mut order, tenant_id, order_id, "B-2", 0, expiry());
        exec(
            &mut order,
            PurchaseOrderCommand::FinalizeQc(FinalizeQc {
                tenant_id,
                order_id,
                occurred_at: test_time(),
            }),
        );

        assert_eq!(order.qc_status(), OrderQcStatus::Passed);
        assert_eq!(order.status(), OrderStatus::Received);
    }

    #[test]
    fn finalize_mixed_outcomes_is_partially_passed() {
        let tenant_id = test_tenant_id();
        let order_id = test_order_id();
        let mut order = confirmed_order(
            tenant_id,
            order_id,
            vec![test_item("B-1", 10), test_item("B-2", 6)],
        );

        submit_qc(&mut order, tenant_id, order_id, "B-1", 0, expiry());
        submit_qc(&mut order, tenant_id, order_id, "B-2", 6, None);
        exec(
            &mut order,
            PurchaseOrderCommand::FinalizeQc(FinalizeQc {
                tenant_id,
                order_id,
                occurred_at: test_time(),
            }),
        );

        assert_eq!(order.qc_status(), OrderQcStatus::PartiallyPassed);
        assert_eq!(order.status(), OrderStatus::QcFailedPendingReturn);
    }

    #[test]
    fn finalize_all_failed_is_failed() {
        let tenant_id = test_tenant_id();
        let order_id = test_order_id();
        let mut order = confirmed_order(
            tenant_id,
            order_id,
            vec![test_item("B-1", 10), test_item("B-2", 6)],
        );

        submit_qc(&mut order, tenant_id, order_id, "B-1", 10, None);
        submit_qc(&mut order, tenant_id, order_id, "B-2", 6, None);
        exec(
            &mut order,
            PurchaseOrderCommand::FinalizeQc(FinalizeQc {
                tenant_id,
                order_id,
                occurred_at: test_time(),
            }),
        );

        assert_eq!(order.qc_status(), OrderQcStatus::Failed);
        assert_eq!(order.status(), OrderStatus::QcFailedPendingReturn);
    }

    #[test]
    fn return_item_before_finalization_is_a_conflict() {
        let tenant_id = test_tenant_id();
        let order_id = test_order_id();
        let mut order = confirmed_order(tenant_id, order_id, vec![test_item("B-1", 10)]);
        submit_qc(&mut order, tenant_id, order_id, "B-1", 10, None);

        let err = exec_err(
            &mut order,
            PurchaseOrderCommand::ReturnItem(ReturnItem {
                tenant_id,
                order_id,
                batch_number: batch("B-1"),
                quantity: 10,
                occurred_at: test_time(),
            }),
        );
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    /// The full fail-and-return chain from the specification of the flow:
    /// create → confirm → QC all failed → finalize → return item → return order.
    #[test]
    fn full_fail_and_return_scenario() {
        let tenant_id = test_tenant_id();
        let order_id = test_order_id();
        let mut order = confirmed_order(tenant_id, order_id, vec![test_item("B-1", 10)]);

        submit_qc(&mut order, tenant_id, order_id, "B-1", 10, None);
        assert_eq!(order.lot(&batch("B-1")).unwrap().qc_status, LotQcStatus::Failed);

        exec(
            &mut order,
            PurchaseOrderCommand::FinalizeQc(FinalizeQc {
                tenant_id,
                order_id,
                occurred_at: test_time(),
            }),
        );
        assert_eq!(order.qc_status(), OrderQcStatus::Failed);
        assert_eq!(order.status(), OrderStatus::QcFailedPendingReturn);

        exec(
            &mut order,
            PurchaseOrderCommand::ReturnItem(ReturnItem {
                tenant_id,
                order_id,
                batch_number: batch("B-1"),
                quantity: 10,
                occurred_at: test_time(),
            }),
        );
        let lot = order.lot(&batch("B-1")).unwrap();
        assert!(lot.is_returned);
        assert_eq!(lot.remaining_quantity, 0);

        exec(
            &mut order,
            PurchaseOrderCommand::ReturnOrder(ReturnOrder {
                tenant_id,
                order_id,
                occurred_at: test_time(),
            }),
        );
        assert_eq!(order.status(), OrderStatus::QcFailedReturned);
    }

    #[test]
    fn second_full_return_is_a_conflict_and_quantity_never_goes_negative() {
        let tenant_id = test_tenant_id();
        let order_id = test_order_id();
        let mut order = confirmed_order(tenant_id, order_id, vec![test_item("B-1", 10)]);
        submit_qc(&mut order, tenant_id, order_id, "B-1", 10, None);
        exec(
            &mut order,
            PurchaseOrderCommand::FinalizeQc(FinalizeQc {
                tenant_id,
                order_id,
                occurred_at: test_time(),
            }),
        );

        let return_cmd = PurchaseOrderCommand::ReturnItem(ReturnItem {
            tenant_id,
            order_id,
            batch_number: batch("B-1"),
            quantity: 10,
            occurred_at: test_time(),
        });
        exec(&mut order, return_cmd.clone());

        let err = exec_err(&mut order, return_cmd);
        assert!(matches!(err, DomainError::Conflict(_)));
        let lot = order.lot(&batch("B-1")).unwrap();
        assert_eq!(lot.remaining_quantity, 0);
        // Returned in full is not closed: is_active is the close flag.
        assert!(lot.is_active);
    }

    #[test]
    fn returning_more_than_failed_units_is_rejected() {
        let tenant_id = test_tenant_id();
        let order_id = test_order_id();
        let mut order = confirmed_order(tenant_id, order_id, vec![test_item("B-1", 10)]);
        // 4 failed out of 10; the 6 passed units stay in stock.
        submit_qc(&mut order, tenant_id, order_id, "B-1", 4, expiry());
        exec(
            &mut order,
            PurchaseOrderCommand::FinalizeQc(FinalizeQc {
                tenant_id,
                order_id,
                occurred_at: test_time(),
            }),
        );

        let err = exec_err(
            &mut order,
            PurchaseOrderCommand::ReturnItem(ReturnItem {
                tenant_id,
                order_id,
                batch_number: batch("B-1"),
                quantity: 5,
                occurred_at: test_time(),
            }),
        );
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn return_order_with_nothing_returned_is_a_conflict() {
        let tenant_id = test_tenant_id();
        let order_id = test_order_id();
        let mut order = confirmed_order(tenant_id, order_id, vec![test_item("B-1", 10)]);
        submit_qc(&mut order, tenant_id, order_id, "B-1", 10, None);
        exec(
            &mut order,
            PurchaseOrderCommand::FinalizeQc(FinalizeQc {
                tenant_id,
                order_id,
                occurred_at: test_time(),
            }),
        );

        let err = exec_err(
            &mut order,
            PurchaseOrderCommand::ReturnOrder(ReturnOrder {
                tenant_id,
                order_id,
                occurred_at: test_time(),
            }),
        );
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn partial_return_marks_order_partially_returned() {
        let tenant_id = test_tenant_id();
        let order_id = test_order_id();
        let mut order = confirmed_order(
            tenant_id,
            order_id,
            vec![test_item("B-1", 10), test_item("B-2", 6)],
        );
        submit_qc(&mut order, tenant_id, order_id, "B-1", 10, None);
        submit_qc(&mut order, tenant_id, order_id, "B-2", 6, None);
        exec(
            &mut order,
            PurchaseOrderCommand::FinalizeQc(FinalizeQc {
                tenant_id,
                order_id,
                occurred_at: test_time(),
            }),
        );

        exec(
            &mut order,
            PurchaseOrderCommand::ReturnItem(ReturnItem {
                tenant_id,
                order_id,
                batch_number: batch("B-1"),
                quantity: 10,
                occurred_at: test_time(),
            }),
        );
        exec(
            &mut order,
            PurchaseOrderCommand::ReturnOrder(ReturnOrder {
                tenant_id,
                order_id,
                occurred_at: test_time(),
            }),
        );
        assert_eq!(order.status(), OrderStatus::QcFailedPartiallyReturned);

        // Returning the second lot and summarizing again reaches the terminal state.
        exec(
            &mut order,
            PurchaseOrderCommand::ReturnItem(ReturnItem {
                tenant_id,
                order_id,
                batch_number: batch("B-2"),
                quantity: 6,
                occurred_at: test_time(),
            }),
        );
        exec(
            &mut order,
            PurchaseOrderCommand::ReturnOrder(ReturnOrder {
                tenant_id,
                order_id,
                occurred_at: test_time(),
            }),
        );
        assert_eq!(order.status(), OrderStatus::QcFailedReturned);

        // Terminal: no further return operations are accepted.
        let err = exec_err(
            &mut order,
            PurchaseOrderCommand::ReturnOrder(ReturnOrder {
                tenant_id,
                order_id,
                occurred_at: test_time(),
            }),
        );
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn close_lot_requires_a_reason_and_is_terminal_for_the_lot() {
        let tenant_id = test_tenant_id();
        let order_id = test_order_id();
        let mut order = confirmed_order(tenant_id, order_id, vec![test_item("B-1", 10)]);

        let err = exec_err(
            &mut order,
            PurchaseOrderCommand::CloseLot(CloseLot {
                tenant_id,
                order_id,
                batch_number: batch("B-1"),
                reason: "  ".to_string(),
                occurred_at: test_time(),
            }),
        );
        assert!(matches!(err, DomainError::Validation(_)));

        exec(
            &mut order,
            PurchaseOrderCommand::CloseLot(CloseLot {
                tenant_id,
                order_id,
                batch_number: batch("B-1"),
                reason: "damaged in storage".to_string(),
                occurred_at: test_time(),
            }),
        );
        let lot = order.lot(&batch("B-1")).unwrap();
        assert!(!lot.is_active);
        assert_eq!(lot.close_reason.as_deref(), Some("damaged in storage"));

        let err = exec_err(
            &mut order,
            PurchaseOrderCommand::CloseLot(CloseLot {
                tenant_id,
                order_id,
                batch_number: batch("B-1"),
                reason: "again".to_string(),
                occurred_at: test_time(),
            }),
        );
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn unknown_batch_is_not_found() {
        let tenant_id = test_tenant_id();
        let order_id = test_order_id();
        let mut order = confirmed_order(tenant_id, order_id, vec![test_item("B-1", 10)]);

        let err = exec_err(
            &mut order,
            PurchaseOrderCommand::SubmitQc(SubmitQc {
                tenant_id,
                order_id,
                batch_number: batch("NO-SUCH"),
                failed_quantity: 0,
                remarks: None,
                expiry_date: expiry(),
                attachments: vec![],
                inspector_id: UserId::new(),
                occurred_at: test_time(),
            }),
        );
        assert!(matches!(err, DomainError::NotFound));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: for any lot size, failed count and sequence of attempted
        /// returns, `0 <= remaining <= quantity` always holds and the returned
        /// units never exceed the failed units.
        #[test]
        fn remaining_quantity_stays_in_bounds_under_any_return_sequence(
            quantity in 1i64..200,
            failed_ratio in 0.0f64..=1.0,
            attempts in prop::collection::vec(1i64..64, 0..12)
        ) {
            let failed = ((quantity as f64) * failed_ratio) as i64;
            let tenant_id = test_tenant_id();
            let order_id = test_order_id();
            let mut order = confirmed_order(tenant_id, order_id, vec![test_item("B-1", quantity)]);

            submit_qc(&mut order, tenant_id, order_id, "B-1", failed, expiry());
            exec(
                &mut order,
                PurchaseOrderCommand::FinalizeQc(FinalizeQc {
                    tenant_id,
                    order_id,
                    occurred_at: test_time(),
                }),
            );

            for qty in attempts {
                let cmd = PurchaseOrderCommand::ReturnItem(ReturnItem {
                    tenant_id,
                    order_id,
                    batch_number: batch("B-1"),
                    quantity: qty,
                    occurred_at: test_time(),
                });
                // Rejected attempts must leave state untouched; accepted ones
                // are applied. Either way the invariants below must hold.
                if let Ok(events) = order.handle(&cmd) {
                    for e in &events {
                        order.apply(e);
                    }
                }

                let lot = order.lot(&batch("B-1")).unwrap();
                prop_assert!(lot.remaining_quantity >= 0);
                prop_assert!(lot.remaining_quantity <= lot.quantity);
                prop_assert!(lot.returned_quantity <= failed);
                prop_assert_eq!(
                    lot.is_returned,
                    lot.remaining_quantity == 0
                );
            }
        }

        /// Property: lot quantities always conserve the ordered quantities,
        /// whatever mix of items the order was created with.
        #[test]
        fn lots_conserve_item_quantities(
            quantities in prop::collection::vec(1i64..500, 1..8)
        ) {
            let tenant_id = test_tenant_id();
            let order_id = test_order_id();
            let items: Vec<OrderItem> = quantities
                .iter()
                .enumerate()
                .map(|(i, q)| test_item(&format!("B-{i}"), *q))
                .collect();

            let order = created_order(tenant_id, order_id, items);

            let item_total: i64 = order.items().iter().map(|i| i.quantity).sum();
            let lot_total: i64 = order.lots().iter().map(|l| l.quantity).sum();
            prop_assert_eq!(item_total, lot_total);
        }
    }
}
