//! Merging join rows back onto their parents.

use crate::entity::{Entity, EntityId};
use crate::error::MappingError;
use crate::row::{FromRow, RawRow};
use std::collections::{HashMap, HashSet};

/// Column carrying the parent identity in many-to-many join queries.
pub const PARENT_ID_COLUMN: &str = "parent_id";

/// One `(parent id, related entity)` pair read from a join query.
///
/// Exists only between the fetch and the merge.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinRow<R> {
    pub parent_id: EntityId,
    pub related: R,
}

impl<R> JoinRow<R> {
    pub fn new(parent_id: EntityId, related: R) -> Self {
        Self { parent_id, related }
    }
}

impl<R: FromRow> FromRow for JoinRow<R> {
    fn from_row<Row: RawRow + ?Sized>(row: &Row) -> Result<Self, MappingError> {
        Ok(Self {
            parent_id: row.required_i64(PARENT_ID_COLUMN)?,
            related: R::from_row(row)?,
        })
    }
}

/// Assign the related sets carried by `rows` to `parents`.
///
/// Every parent receives a set through `setter`: the rows keyed by its id,
/// or an empty set when there are none. Rows for ids outside the batch are
/// dropped. Duplicate `(parent, related)` pairs are kept unless `dedupe` is
/// set, in which case the first occurrence of each related id wins.
pub fn merge_join_rows<P, R, F>(parents: &mut [P], rows: Vec<JoinRow<R>>, dedupe: bool, setter: F)
where
    P: Entity,
    R: Entity + Clone,
    F: Fn(&mut P, Vec<R>),
{
    let mut grouped: HashMap<EntityId, Vec<R>> = HashMap::new();
    let mut seen: HashSet<(EntityId, EntityId)> = HashSet::new();

    for JoinRow { parent_id, related } in rows {
        if dedupe && !seen.insert((parent_id, related.id())) {
            continue;
        }
        grouped.entry(parent_id).or_default().push(related);
    }

    for parent in parents.iter_mut() {
        let set = grouped.get(&parent.id()).cloned().unwrap_or_default();
        setter(parent, set);
    }
}
