//! `lotgate-core` — domain foundation for the receiving/QC system.
//!
//! Pure domain primitives only: identifiers, the aggregate contract and the
//! error taxonomy. No IO, no infrastructure concerns.

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod id;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{AggregateId, TenantId, UserId};
