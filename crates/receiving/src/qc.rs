//! Quality-control records and the aggregation rules.
//!
//! Both aggregations are pure functions of their inputs so they can be unit
//! tested without any store and are the *only* place lot/order QC statuses
//! are computed; nothing else hand-edits a status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use lotgate_catalog::{AttachmentRef, ProductId, SupplierId, WarehouseId};
use lotgate_core::{DomainError, DomainResult, UserId};

use crate::lot::BatchNumber;

/// QC outcome of a single stock lot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LotQcStatus {
    Pending,
    Passed,
    PartiallyFailed,
    Failed,
}

impl LotQcStatus {
    /// An inspection has been recorded for the lot.
    pub fn is_resolved(self) -> bool {
        self != LotQcStatus::Pending
    }

    /// At least one unit failed inspection.
    pub fn has_failure(self) -> bool {
        matches!(self, LotQcStatus::Failed | LotQcStatus::PartiallyFailed)
    }

    /// At least one unit passed inspection. A partially failed lot counts
    /// toward both sides of the order rollup.
    pub fn has_pass(self) -> bool {
        matches!(self, LotQcStatus::Passed | LotQcStatus::PartiallyFailed)
    }
}

/// Order-level rollup of the lots' QC outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderQcStatus {
    Pending,
    Passed,
    PartiallyPassed,
    Failed,
}

/// How far inspection of an order has progressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InspectionProgress {
    /// No lot has been inspected yet.
    NotStarted,
    /// Some lots inspected, some still pending.
    InProgress,
    /// Every lot has a recorded outcome.
    Complete,
}

/// One inspection event for a batch. The lot keeps the current record;
/// once the lot's status left `Pending` the record is immutable (edits are
/// rejected upstream with a conflict).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QcRecord {
    pub id: Uuid,
    pub batch_number: BatchNumber,
    pub product_id: ProductId,
    pub supplier_id: SupplierId,
    pub warehouse_id: WarehouseId,
    pub total_quantity: i64,
    pub failed_quantity: i64,
    pub status: LotQcStatus,
    pub remarks: Option<String>,
    pub attachments: Vec<AttachmentRef>,
    pub inspector_id: UserId,
    pub inspection_date: DateTime<Utc>,
}

impl QcRecord {
    /// Derived: `passed = total - failed`.
    pub fn passed_quantity(&self) -> i64 {
        self.total_quantity - self.failed_quantity
    }
}

/// Lot-level aggregation: derive a lot's QC status from the inspected and
/// failed quantities of its most recent record.
pub fn lot_qc_status(total_quantity: i64, failed_quantity: i64) -> DomainResult<LotQcStatus> {
    if total_quantity <= 0 {
        return Err(DomainError::validation("inspected quantity must be positive"));
    }
    if failed_quantity < 0 {
        return Err(DomainError::validation("failed quantity cannot be negative"));
    }
    if failed_quantity > total_quantity {
        return Err(DomainError::validation(
            "failed quantity cannot exceed inspected quantity",
        ));
    }

    Ok(if failed_quantity == 0 {
        LotQcStatus::Passed
    } else if failed_quantity == total_quantity {
        LotQcStatus::Failed
    } else {
        LotQcStatus::PartiallyFailed
    })
}

/// Order-level rollup over the lots' statuses.
///
/// Lots still pending are excluded: the rollup summarizes what has actually
/// been inspected. All-pending yields `Pending` (finalization is rejected in
/// that case before this function matters).
pub fn order_qc_rollup(statuses: &[LotQcStatus]) -> OrderQcStatus {
    let resolved: Vec<LotQcStatus> = statuses
        .iter()
        .copied()
        .filter(|s| s.is_resolved())
        .collect();

    if resolved.is_empty() {
        return OrderQcStatus::Pending;
    }

    let any_failure = resolved.iter().any(|s| s.has_failure());
    let any_pass = resolved.iter().any(|s| s.has_pass());

    if !any_failure {
        OrderQcStatus::Passed
    } else if any_pass {
        OrderQcStatus::PartiallyPassed
    } else {
        OrderQcStatus::Failed
    }
}

/// Classify inspection progress of an order from its lots' statuses.
pub fn inspection_progress(statuses: &[LotQcStatus]) -> InspectionProgress {
    let resolved = statuses.iter().filter(|s| s.is_resolved()).count();

    if resolved == 0 {
        InspectionProgress::NotStarted
    } else if resolved == statuses.len() {
        InspectionProgress::Complete
    } else {
        InspectionProgress::InProgress
    }
}
