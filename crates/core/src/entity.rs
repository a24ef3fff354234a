//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Every remote-owned record exposes its identifier so list state can be
/// searched and replaced without knowing the concrete type.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
