//! The related-entity lookup used by has-one hydration.

use crate::entity::EntityId;
use crate::error::HydrationError;
use std::collections::HashMap;

/// Batch lookup of related entities by identity.
///
/// Implementations return at most one entry per requested id and simply omit
/// ids with no matching row. Each entity's data-access object provides one.
pub trait RelatedSource<R> {
    /// # Errors
    ///
    /// Returns `HydrationError` if the underlying lookup fails.
    fn fetch_by_ids(&self, ids: &[EntityId]) -> Result<HashMap<EntityId, R>, HydrationError>;
}

impl<R, F> RelatedSource<R> for F
where
    F: Fn(&[EntityId]) -> Result<HashMap<EntityId, R>, HydrationError>,
{
    fn fetch_by_ids(&self, ids: &[EntityId]) -> Result<HashMap<EntityId, R>, HydrationError> {
        self(ids)
    }
}
