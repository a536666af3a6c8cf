//! Small `sea_query` helpers for identifiers known only at runtime.

use crate::entity::EntityId;
use sea_query::{Iden, Value};

/// A table or column name configured at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Name(pub(crate) String);

impl Iden for Name {
    fn unquoted(&self) -> &str {
        &self.0
    }
}

pub(crate) fn name(value: &str) -> Name {
    Name(value.to_string())
}

/// Bind values for an `IN (...)` list of ids.
pub(crate) fn id_values(ids: &[EntityId]) -> Vec<Value> {
    ids.iter().map(|id| Value::BigInt(Some(*id))).collect()
}
