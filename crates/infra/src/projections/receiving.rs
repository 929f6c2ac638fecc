use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use lotgate_catalog::{AttachmentRef, ProductId, SupplierId, WarehouseId};
use lotgate_core::{AggregateId, TenantId, UserId};
use lotgate_events::EventEnvelope;
use lotgate_receiving::qc::{inspection_progress, order_qc_rollup, InspectionProgress};
use lotgate_receiving::{
    LotQcStatus, OrderQcStatus, OrderStatus, PurchaseOrderEvent, PurchaseOrderId, StockLot,
};

use crate::read_model::TenantStore;

/// Flattened QC outcome for one lot, as exposed to queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QcRecordView {
    pub failed_quantity: i64,
    pub passed_quantity: i64,
    pub status: LotQcStatus,
    pub remarks: Option<String>,
    pub attachments: Vec<AttachmentRef>,
    pub inspector_id: UserId,
    pub inspection_date: DateTime<Utc>,
}

/// Query-side view of one stock lot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotView {
    pub batch_number: String,
    pub product_id: ProductId,
    pub barcode: String,
    pub quantity: i64,
    pub remaining_quantity: i64,
    pub returned_quantity: i64,
    pub cost_price: u64,
    pub sale_price: Option<u64>,
    pub expiry_date: Option<NaiveDate>,
    pub qc_status: LotQcStatus,
    pub qc: Option<QcRecordView>,
    pub is_active: bool,
    pub is_returned: bool,
    pub close_reason: Option<String>,
}

impl LotView {
    fn from_lot(lot: &StockLot) -> Self {
        Self {
            batch_number: lot.batch_number.as_str().to_string(),
            product_id: lot.product_id,
            barcode: lot.barcode.clone(),
            quantity: lot.quantity,
            remaining_quantity: lot.remaining_quantity,
            returned_quantity: lot.returned_quantity,
            cost_price: lot.cost_price,
            sale_price: lot.sale_price,
            expiry_date: lot.expiry_date,
            qc_status: lot.qc_status,
            qc: None,
            is_active: lot.is_active,
            is_returned: lot.is_returned,
            close_reason: lot.close_reason.clone(),
        }
    }
}

/// Query-side view of a purchase order with its lots and QC outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderReadModel {
    pub order_id: PurchaseOrderId,
    pub order_number: String,
    pub supplier_id: SupplierId,
    pub warehouse_id: WarehouseId,
    pub invoice_number: Option<String>,
    pub status: OrderStatus,
    pub qc_status: OrderQcStatus,
    pub lots: Vec<LotView>,
}

impl PurchaseOrderReadModel {
    fn lot_mut(&mut self, batch_number: &str) -> Option<&mut LotView> {
        self.lots.iter_mut().find(|l| l.batch_number == batch_number)
    }

    fn recompute_qc_rollup(&mut self) {
        let statuses: Vec<LotQcStatus> = self.lots.iter().map(|l| l.qc_status).collect();
        if inspection_progress(&statuses) != InspectionProgress::NotStarted {
            self.status = OrderStatus::PartiallyInspected;
        }
        self.qc_status = match inspection_progress(&statuses) {
            InspectionProgress::Complete => order_qc_rollup(&statuses),
            _ => OrderQcStatus::Pending,
        };
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct CursorKey {
    tenant_id: TenantId,
    aggregate_id: AggregateId,
}

#[derive(Debug, Error)]
pub enum OrdersProjectionError {
    #[error("failed to deserialize purchase order event: {0}")]
    Deserialize(String),
    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),
    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },
    #[error("event for unknown purchase order {0}")]
    UnknownOrder(PurchaseOrderId),
}

/// Builds [`PurchaseOrderReadModel`]s from the purchase order event stream.
///
/// Tracks a per-stream cursor so duplicate deliveries are dropped and a gap
/// in sequence numbers is surfaced as an error instead of silently applied.
#[derive(Debug)]
pub struct OrdersProjection<S>
where
    S: TenantStore<PurchaseOrderId, PurchaseOrderReadModel>,
{
    store: S,
    cursors: RwLock<HashMap<CursorKey, u64>>,
}

impl<S> OrdersProjection<S>
where
    S: TenantStore<PurchaseOrderId, PurchaseOrderReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: RwLock::new(HashMap::new()),
        }
    }

    fn cursor(&self, key: CursorKey) -> u64 {
        match self.cursors.read() {
            Ok(cursors) => *cursors.get(&key).unwrap_or(&0),
            Err(_) => 0,
        }
    }

    fn update_cursor(&self, key: CursorKey, seq: u64) {
        if let Ok(mut cursors) = self.cursors.write() {
            cursors.insert(key, seq);
        }
    }

    fn clear_cursors(&self, tenant_id: TenantId) {
        if let Ok(mut cursors) = self.cursors.write() {
            cursors.retain(|k, _| k.tenant_id != tenant_id);
        }
    }

    pub fn get(
        &self,
        tenant_id: TenantId,
        order_id: &PurchaseOrderId,
    ) -> Option<PurchaseOrderReadModel> {
        self.store.get(tenant_id, order_id)
    }

    pub fn list(&self, tenant_id: TenantId) -> Vec<PurchaseOrderReadModel> {
        self.store.list(tenant_id)
    }

    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), OrdersProjectionError> {
        if envelope.aggregate_type() != "receiving.purchase_order" {
            return Ok(());
        }

        let tenant_id = envelope.tenant_id();
        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();
        let key = CursorKey {
            tenant_id,
            aggregate_id,
        };

        let last = self.cursor(key);
        if seq == 0 {
            return Err(OrdersProjectionError::NonMonotonicSequence { last, found: seq });
        }
        // At-least-once delivery: replays are dropped, gaps are errors.
        if seq <= last {
            return Ok(());
        }
        if seq != last + 1 {
            return Err(OrdersProjectionError::NonMonotonicSequence { last, found: seq });
        }

        let ev: PurchaseOrderEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| OrdersProjectionError::Deserialize(e.to_string()))?;

        let (event_tenant, order_id) = match &ev {
            PurchaseOrderEvent::OrderCreated(e) => (e.tenant_id, e.order_id),
            PurchaseOrderEvent::OrderConfirmed(e) => (e.tenant_id, e.order_id),
            PurchaseOrderEvent::OrderCancelled(e) => (e.tenant_id, e.order_id),
            PurchaseOrderEvent::LotQcRecorded(e) => (e.tenant_id, e.order_id),
            PurchaseOrderEvent::OrderQcFinalized(e) => (e.tenant_id, e.order_id),
            PurchaseOrderEvent::LotReturned(e) => (e.tenant_id, e.order_id),
            PurchaseOrderEvent::OrderReturned(e) => (e.tenant_id, e.order_id),
            PurchaseOrderEvent::LotClosed(e) => (e.tenant_id, e.order_id),
        };

        if event_tenant != tenant_id {
            return Err(OrdersProjectionError::TenantIsolation(
                "event tenant_id does not match envelope tenant_id".to_string(),
            ));
        }
        if order_id.0 != aggregate_id {
            return Err(OrdersProjectionError::TenantIsolation(
                "event order_id does not match envelope aggregate_id".to_string(),
            ));
        }

        match ev {
            PurchaseOrderEvent::OrderCreated(e) => {
                self.store.upsert(
                    tenant_id,
                    e.order_id,
                    PurchaseOrderReadModel {
                        order_id: e.order_id,
                        order_number: e.order_number,
                        supplier_id: e.supplier_id,
                        warehouse_id: e.warehouse_id,
                        invoice_number: e.invoice_number,
                        status: OrderStatus::Pending,
                        qc_status: OrderQcStatus::Pending,
                        lots: e.lots.iter().map(LotView::from_lot).collect(),
                    },
                );
            }
            PurchaseOrderEvent::OrderConfirmed(e) => {
                let mut rm = self.take(tenant_id, e.order_id)?;
                rm.status = OrderStatus::AwaitingQc;
                self.store.upsert(tenant_id, e.order_id, rm);
            }
            PurchaseOrderEvent::OrderCancelled(e) => {
                let mut rm = self.take(tenant_id, e.order_id)?;
                rm.status = OrderStatus::Cancelled;
                for lot in &mut rm.lots {
                    lot.is_active = false;
                }
                self.store.upsert(tenant_id, e.order_id, rm);
            }
            PurchaseOrderEvent::LotQcRecorded(e) => {
                let mut rm = self.take(tenant_id, e.order_id)?;
                if let Some(lot) = rm.lot_mut(e.batch_number.as_str()) {
                    lot.qc_status = e.record.status;
                    if e.expiry_date.is_some() {
                        lot.expiry_date = e.expiry_date;
                    }
                    lot.qc = Some(QcRecordView {
                        failed_quantity: e.record.failed_quantity,
                        passed_quantity: e.record.passed_quantity(),
                        status: e.record.status,
                        remarks: e.record.remarks,
                        attachments: e.record.attachments,
                        inspector_id: e.record.inspector_id,
                        inspection_date: e.record.inspection_date,
                    });
                }
                rm.recompute_qc_rollup();
                self.store.upsert(tenant_id, e.order_id, rm);
            }
            PurchaseOrderEvent::OrderQcFinalized(e) => {
                let mut rm = self.take(tenant_id, e.order_id)?;
                rm.status = e.status;
                rm.qc_status = e.qc_status;
                self.store.upsert(tenant_id, e.order_id, rm);
            }
            PurchaseOrderEvent::LotReturned(e) => {
                let mut rm = self.take(tenant_id, e.order_id)?;
                if let Some(lot) = rm.lot_mut(e.batch_number.as_str()) {
                    lot.remaining_quantity -= e.quantity;
                    lot.returned_quantity += e.quantity;
                    if lot.remaining_quantity == 0 {
                        lot.is_returned = true;
                    }
                }
                self.store.upsert(tenant_id, e.order_id, rm);
            }
            PurchaseOrderEvent::OrderReturned(e) => {
                let mut rm = self.take(tenant_id, e.order_id)?;
                rm.status = e.status;
                self.store.upsert(tenant_id, e.order_id, rm);
            }
            PurchaseOrderEvent::LotClosed(e) => {
                let mut rm = self.take(tenant_id, e.order_id)?;
                if let Some(lot) = rm.lot_mut(e.batch_number.as_str()) {
                    lot.is_active = false;
                    lot.close_reason = Some(e.reason);
                }
                self.store.upsert(tenant_id, e.order_id, rm);
            }
        }

        self.update_cursor(key, seq);
        Ok(())
    }

    /// Full rebuild from a replayed stream, clearing affected tenants first.
    pub fn rebuild_from_scratch(
        &self,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), OrdersProjectionError> {
        let mut envs: Vec<_> = envelopes.into_iter().collect();

        {
            let mut tenants = envs.iter().map(|e| e.tenant_id()).collect::<Vec<_>>();
            tenants.sort_by_key(|t| *t.as_uuid().as_bytes());
            tenants.dedup();
            for t in tenants {
                self.store.clear_tenant(t);
                self.clear_cursors(t);
            }
        }

        envs.sort_by_key(|e| {
            (
                *e.tenant_id().as_uuid().as_bytes(),
                *e.aggregate_id().as_uuid().as_bytes(),
                e.sequence_number(),
            )
        });

        for env in &envs {
            self.apply_envelope(env)?;
        }
        Ok(())
    }

    fn take(
        &self,
        tenant_id: TenantId,
        order_id: PurchaseOrderId,
    ) -> Result<PurchaseOrderReadModel, OrdersProjectionError> {
        self.store
            .get(tenant_id, &order_id)
            .ok_or(OrdersProjectionError::UnknownOrder(order_id))
    }
}
