use crate::entity::{Entity, EntityId};
use crate::error::MappingError;
use crate::row::{FromRow, RawRow};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Genre {
    pub id: EntityId,
    pub name: String,
}

impl Genre {
    pub fn new(id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl Entity for Genre {
    fn id(&self) -> EntityId {
        self.id
    }
}

impl FromRow for Genre {
    fn from_row<R: RawRow + ?Sized>(row: &R) -> Result<Self, MappingError> {
        Ok(Self {
            id: row.required_i64("id")?,
            name: row.required_string("name")?,
        })
    }
}
