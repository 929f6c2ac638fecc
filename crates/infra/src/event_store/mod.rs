//! Append-only, tenant-scoped event stream storage.
//!
//! One stream per purchase order; appends are atomic per batch and guarded by
//! optimistic concurrency, which is what serializes writers on an order.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
pub use r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};
