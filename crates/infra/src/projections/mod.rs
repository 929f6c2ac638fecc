//! Projection implementations (read model builders).
//!
//! Projections consume committed events and maintain query-optimized read
//! models. They are rebuildable from the stream, tenant-isolated, and
//! idempotent under at-least-once delivery.

pub mod receiving;

pub use receiving::{
    LotView, OrdersProjection, OrdersProjectionError, PurchaseOrderReadModel, QcRecordView,
};
