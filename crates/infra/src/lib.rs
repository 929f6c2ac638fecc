//! Infrastructure layer: event persistence, command dispatch, read models.

pub mod command_dispatcher;
pub mod event_store;
pub mod projections;
pub mod read_model;


pub use command_dispatcher::{CommandDispatcher, DispatchError};
pub use event_store::{EventStore, EventStoreError, InMemoryEventStore, StoredEvent, UncommittedEvent};
pub use projections::receiving::{
    LotView, OrdersProjection, OrdersProjectionError, PurchaseOrderReadModel, QcRecordView,
};
pub use read_model::{InMemoryTenantStore, TenantStore};
