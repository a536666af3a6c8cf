use crate::entity::{Entity, EntityId};
use crate::error::MappingError;
use crate::row::{FromRow, RawRow};

/// A catalog user. Book authors are users.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct User {
    pub id: EntityId,
    pub full_name: String,
}

impl User {
    pub fn new(id: EntityId, full_name: impl Into<String>) -> Self {
        Self {
            id,
            full_name: full_name.into(),
        }
    }
}

impl Entity for User {
    fn id(&self) -> EntityId {
        self.id
    }
}

impl FromRow for User {
    fn from_row<R: RawRow + ?Sized>(row: &R) -> Result<Self, MappingError> {
        Ok(Self {
            id: row.required_i64("id")?,
            full_name: row.required_string("full_name")?,
        })
    }
}
