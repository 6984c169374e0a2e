//! Entity trait: identity that survives state changes.

/// Something tracked by identity rather than by value.
///
/// Entities live inside an aggregate (e.g. return requests inside a line item)
/// and are addressed by id from commands and events.
pub trait Entity {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;
}
