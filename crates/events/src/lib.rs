//! Domain events and their distribution plumbing.
//!
//! Events are the only output of the receiving aggregate; this crate defines
//! what an event is (`Event`), how it travels (`EventEnvelope`) and how
//! interested parties hear about it (`EventBus`). Delivery is best-effort:
//! the event store, not the bus, is the source of truth, and a status-change
//! notification that gets lost never affects correctness.

mod bus;
mod envelope;
mod event;
mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
