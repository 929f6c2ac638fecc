//! Entity trait: identity plus continuity across state changes.
//!
//! Entities that live inside an aggregate (a stock lot inside a purchase
//! order) implement this; they are addressed through their owning aggregate,
//! never persisted on their own.

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;
}
