//! `lotgate-receiving` — purchase-order receiving and quality control.
//!
//! A purchase order fans out into one stock lot per ordered item; each lot
//! accumulates an independent QC outcome and the order's overall status is
//! derived from the aggregate of its lots. The whole receiving flow (order
//! header, lots, QC records) is one consistency boundary: a single aggregate,
//! a single event stream, so every operation commits atomically and writers
//! on the same order are serialized by the stream version.

pub mod lot;
pub mod order;
pub mod qc;

pub use lot::{BatchNumber, LotId, StockLot};
pub use order::{
    CancelOrder, CloseLot, ConfirmOrder, CreateOrder, FinalizeQc, OrderItem, OrderStatus,
    PurchaseOrder, PurchaseOrderCommand, PurchaseOrderEvent, PurchaseOrderId, ReturnItem,
    ReturnOrder, SubmitQc,
};
pub use qc::{InspectionProgress, LotQcStatus, OrderQcStatus, QcRecord};
