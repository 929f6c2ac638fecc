//! Domain error taxonomy.
//!
//! The split mirrors how callers are expected to react:
//! - `Validation` — malformed input, rejected before any write; retry after
//!   correcting the request.
//! - `Conflict` — the caller raced another writer or repeated a one-shot
//!   action; re-read current state and retry deliberately, never blindly.
//! - `NotFound` — unknown order/lot/batch.
//! - `InvariantViolation` — a state-machine rule would be broken.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Deterministic, business-level failure.
///
/// Infrastructure failures (storage, transport) live elsewhere; nothing in
/// this enum implies a partial write happened.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed or missing input (negative quantity, empty item list, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A state-machine or data invariant would be violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier failed to parse.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The addressed order/lot/batch does not exist.
    #[error("not found")]
    NotFound,

    /// Duplicate one-shot action or stale optimistic-concurrency check.
    /// The message names the specific violated rule.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The request context is not allowed to perform the operation.
    #[error("unauthorized")]
    Unauthorized,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}
