//! Has-one hydration through a foreign key carried by the parent.
//!
//! # Strategy
//!
//! 1. Read the foreign key of every parent once
//! 2. Collect the distinct non-null keys
//! 3. Fetch all of them from the [`RelatedSource`] in one call
//! 4. Attach the fetched entity to each parent whose key resolved
//!
//! Parents whose key is null or dangling are left untouched.

use crate::entity::EntityId;
use crate::error::{ConfigurationError, HydrationError};
use crate::relation::source::RelatedSource;
use std::collections::HashSet;

#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

type ForeignKey<P> = Box<dyn Fn(&P) -> Option<EntityId> + Send + Sync>;
type Setter<P, R> = Box<dyn Fn(&mut P, R) + Send + Sync>;

/// Descriptor of a has-one relation from `P` to `R`.
///
/// # Example
///
/// ```
/// use bookshelf::{Book, EntityId, HasOneRelation, HydrationError, User};
/// use std::collections::HashMap;
///
/// let authors = HasOneRelation::<Book, User>::builder()
///     .foreign_key(|book| book.author_id)
///     .setter(|book, user| book.author = Some(user))
///     .build()
///     .unwrap();
///
/// let mut books = vec![Book::new("Ruslan and Ludmila", 1820, "poem", Some(10))];
/// let source = |ids: &[EntityId]| -> Result<HashMap<EntityId, User>, HydrationError> {
///     Ok(ids.iter().map(|id| (*id, User::new(*id, "A. Pushkin"))).collect())
/// };
/// authors.load(&mut books, &source).unwrap();
/// assert_eq!(books[0].author.as_ref().unwrap().full_name, "A. Pushkin");
/// ```
pub struct HasOneRelation<P, R> {
    foreign_key: ForeignKey<P>,
    setter: Setter<P, R>,
}

impl<P, R> HasOneRelation<P, R> {
    pub fn builder() -> HasOneRelationBuilder<P, R> {
        HasOneRelationBuilder::default()
    }
}

impl<P, R: Clone> HasOneRelation<P, R> {
    /// Attach related entities to `parents` in place.
    ///
    /// Issues no lookup when the batch is empty or every foreign key is null.
    ///
    /// # Errors
    ///
    /// Propagates the source's error unchanged. No parent is mutated in that
    /// case.
    pub fn load<S>(&self, parents: &mut [P], source: &S) -> Result<(), HydrationError>
    where
        S: RelatedSource<R> + ?Sized,
    {
        let keys: Vec<Option<EntityId>> = parents.iter().map(|p| (self.foreign_key)(p)).collect();

        let mut seen = HashSet::new();
        let distinct: Vec<EntityId> = keys
            .iter()
            .flatten()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect();

        if distinct.is_empty() {
            log::debug!(
                "has-one: no foreign keys among {} parents, skipping lookup",
                parents.len()
            );
            return Ok(());
        }

        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::hydration_span("has_one", "lookup", parents.len()).entered();

        let related = source.fetch_by_ids(&distinct)?;

        let mut attached = 0usize;
        let mut dangling = 0usize;
        for (parent, key) in parents.iter_mut().zip(keys) {
            let Some(id) = key else { continue };
            match related.get(&id) {
                Some(entity) => {
                    (self.setter)(parent, entity.clone());
                    attached += 1;
                }
                None => dangling += 1,
            }
        }

        if dangling > 0 {
            log::warn!("has-one: {dangling} parents reference missing related rows");
        }
        log::debug!(
            "has-one: attached {attached} of {} parents from {} distinct keys",
            parents.len(),
            distinct.len()
        );
        Ok(())
    }
}

/// Builder for [`HasOneRelation`]. Both the getter and the setter are required.
pub struct HasOneRelationBuilder<P, R> {
    foreign_key: Option<ForeignKey<P>>,
    setter: Option<Setter<P, R>>,
}

impl<P, R> Default for HasOneRelationBuilder<P, R> {
    fn default() -> Self {
        Self {
            foreign_key: None,
            setter: None,
        }
    }
}

impl<P, R> HasOneRelationBuilder<P, R> {
    /// Foreign key read from each parent; `None` means no relation.
    #[must_use]
    pub fn foreign_key<F>(mut self, f: F) -> Self
    where
        F: Fn(&P) -> Option<EntityId> + Send + Sync + 'static,
    {
        self.foreign_key = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn setter<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut P, R) + Send + Sync + 'static,
    {
        self.setter = Some(Box::new(f));
        self
    }

    /// # Errors
    ///
    /// Returns `ConfigurationError` when the getter or setter is missing.
    pub fn build(self) -> Result<HasOneRelation<P, R>, ConfigurationError> {
        Ok(HasOneRelation {
            foreign_key: self.foreign_key.ok_or(ConfigurationError::MissingForeignKey)?,
            setter: self.setter.ok_or(ConfigurationError::MissingSetter)?,
        })
    }
}
