use super::{
    by_id, count, expect_one_affected, get_many, get_one, insert_returning_id, select_by_ids,
    GENRE_TABLE,
};
use crate::config::HydrationConfig;
use crate::domain::Genre;
use crate::entity::EntityId;
use crate::error::{ConfigurationError, HydrationError};
use crate::executor::SqlRunner;
use crate::relation::RelatedSource;
use sea_query::Value;
use std::collections::HashMap;

const COUNT: &str = "SELECT count(*) AS count FROM genre";
const INSERT: &str = "INSERT INTO genre (name) VALUES ($1) RETURNING id";
const UPDATE: &str = "UPDATE genre SET name = $2 WHERE id = $1";
const GET_BY_ID: &str = "SELECT id, name FROM genre WHERE id = $1";
const GET_ALL: &str = "SELECT id, name FROM genre ORDER BY id";
const DELETE: &str = "DELETE FROM genre WHERE id = $1";

/// Access to the `genre` table.
pub struct GenreDao<'a, S: SqlRunner + ?Sized> {
    runner: &'a S,
    chunk_size: usize,
}

impl<'a, S: SqlRunner + ?Sized> GenreDao<'a, S> {
    pub fn new(runner: &'a S) -> Self {
        Self {
            runner,
            chunk_size: HydrationConfig::default().chunk_size,
        }
    }

    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidChunkSize` for a zero chunk size.
    pub fn with_config(
        runner: &'a S,
        config: &HydrationConfig,
    ) -> Result<Self, ConfigurationError> {
        if config.chunk_size == 0 {
            return Err(ConfigurationError::InvalidChunkSize(0));
        }
        Ok(Self {
            runner,
            chunk_size: config.chunk_size,
        })
    }

    pub fn count(&self) -> Result<i64, HydrationError> {
        count(self.runner, COUNT)
    }

    pub fn insert(&self, genre: &mut Genre) -> Result<(), HydrationError> {
        genre.id = insert_returning_id(self.runner, INSERT, &[Value::from(genre.name.clone())])?;
        Ok(())
    }

    pub fn update(&self, genre: &Genre) -> Result<(), HydrationError> {
        let affected = self
            .runner
            .execute(UPDATE, &[Value::BigInt(Some(genre.id)), Value::from(genre.name.clone())])?;
        expect_one_affected(affected, "genre", genre.id)
    }

    pub fn get_by_id(&self, id: EntityId) -> Result<Genre, HydrationError> {
        get_one(self.runner, GET_BY_ID, id)
    }

    pub fn get_all(&self) -> Result<Vec<Genre>, HydrationError> {
        get_many(self.runner, GET_ALL, &[])
    }

    pub fn get_by_ids(&self, ids: &[EntityId]) -> Result<Vec<Genre>, HydrationError> {
        select_by_ids(self.runner, GENRE_TABLE, ids, self.chunk_size)
    }

    /// Links in `book_genre` go with the genre.
    pub fn delete(&self, id: EntityId) -> Result<(), HydrationError> {
        self.runner.execute(DELETE, &[Value::BigInt(Some(id))])?;
        Ok(())
    }
}

impl<S: SqlRunner + ?Sized> RelatedSource<Genre> for GenreDao<'_, S> {
    fn fetch_by_ids(&self, ids: &[EntityId]) -> Result<HashMap<EntityId, Genre>, HydrationError> {
        Ok(by_id(self.get_by_ids(ids)?))
    }
}
