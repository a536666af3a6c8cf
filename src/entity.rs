//! Stable entity identity used as the join key during hydration.

/// Identity of a persisted row.
pub type EntityId = i64;

/// Anything with a stable unique integer identity.
///
/// Both sides of a relation implement this: the parent being hydrated and the
/// related entity attached to it.
pub trait Entity {
    fn id(&self) -> EntityId;
}
