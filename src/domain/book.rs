use crate::domain::{Genre, User};
use crate::entity::{Entity, EntityId};
use crate::error::MappingError;
use crate::row::{FromRow, RawRow};

/// A book as stored in the `book` table.
///
/// `author` and `genres` are `None` until hydrated. Genre hydration always
/// leaves `genres` as `Some`, empty when the book has no genres.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    pub id: EntityId,
    pub title: String,
    pub year: i32,
    pub description: String,
    pub author_id: Option<EntityId>,
    pub author: Option<User>,
    pub genres: Option<Vec<Genre>>,
}

impl Book {
    /// A book that has not been stored yet (`id` is 0 until inserted).
    pub fn new(
        title: impl Into<String>,
        year: i32,
        description: impl Into<String>,
        author_id: Option<EntityId>,
    ) -> Self {
        Self {
            id: 0,
            title: title.into(),
            year,
            description: description.into(),
            author_id,
            author: None,
            genres: None,
        }
    }

    #[must_use]
    pub fn with_genres(mut self, genres: Vec<Genre>) -> Self {
        self.genres = Some(genres);
        self
    }

    /// Ids of the attached genres, empty when genres are not loaded.
    pub fn genre_ids(&self) -> Vec<EntityId> {
        self.genres
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|g| g.id)
            .collect()
    }
}

impl Entity for Book {
    fn id(&self) -> EntityId {
        self.id
    }
}

impl FromRow for Book {
    fn from_row<R: RawRow + ?Sized>(row: &R) -> Result<Self, MappingError> {
        Ok(Self {
            id: row.required_i64("id")?,
            title: row.required_string("title")?,
            year: row.required_i32("year")?,
            description: row.required_string("description")?,
            author_id: row.get_i64("author_id")?,
            author: None,
            genres: None,
        })
    }
}
