//! Relation hydration for batches of already-loaded entities.
//!
//! Two relation kinds are supported:
//! - has-one: each parent carries a foreign key to at most one related entity
//!   ([`HasOneRelation`]). Related entities come from a [`RelatedSource`].
//! - many-to-many: parents and related entities are linked through a join
//!   table ([`ManyToManyRelation`]). The loader owns the join query and can
//!   fetch either with chunked `IN (...)` lists or with a single subselect
//!   ([`FetchStrategy`]).
//!
//! Loaders hold no state between calls and never issue one query per parent.

pub mod has_one;
pub mod many_to_many;
pub mod merge;
pub mod source;

#[doc(inline)]
pub use has_one::{HasOneRelation, HasOneRelationBuilder};
#[doc(inline)]
pub use many_to_many::{FetchStrategy, ManyToManyRelation, ManyToManyRelationBuilder};
#[doc(inline)]
pub use merge::{merge_join_rows, JoinRow, PARENT_ID_COLUMN};
#[doc(inline)]
pub use source::RelatedSource;
