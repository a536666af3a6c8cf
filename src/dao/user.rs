use super::{
    by_id, count, expect_one_affected, get_many, get_one, insert_returning_id, select_by_ids,
    USER_TABLE,
};
use crate::config::HydrationConfig;
use crate::domain::User;
use crate::entity::EntityId;
use crate::error::{ConfigurationError, HydrationError};
use crate::executor::SqlRunner;
use crate::relation::RelatedSource;
use sea_query::Value;
use std::collections::HashMap;

const COUNT: &str = "SELECT count(*) AS count FROM users";
const INSERT: &str = "INSERT INTO users (full_name) VALUES ($1) RETURNING id";
const UPDATE: &str = "UPDATE users SET full_name = $2 WHERE id = $1";
const GET_BY_ID: &str = "SELECT id, full_name FROM users WHERE id = $1";
const GET_ALL: &str = "SELECT id, full_name FROM users ORDER BY id";
const DELETE: &str = "DELETE FROM users WHERE id = $1";

/// Access to the `users` table. Also the author source for book hydration.
pub struct UserDao<'a, S: SqlRunner + ?Sized> {
    runner: &'a S,
    chunk_size: usize,
}

impl<'a, S: SqlRunner + ?Sized> UserDao<'a, S> {
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

    /// Store a new user and write the generated id back.
    pub fn insert(&self, user: &mut User) -> Result<(), HydrationError> {
        user.id = insert_returning_id(self.runner, INSERT, &[Value::from(user.full_name.clone())])?;
        log::debug!("inserted user {}", user.id);
        Ok(())
    }

    pub fn update(&self, user: &User) -> Result<(), HydrationError> {
        let affected = self.runner.execute(
            UPDATE,
            &[Value::BigInt(Some(user.id)), Value::from(user.full_name.clone())],
        )?;
        expect_one_affected(affected, "user", user.id)
    }

    /// # Errors
    ///
    /// `StorageError::NoRows` when no user has this id.
    pub fn get_by_id(&self, id: EntityId) -> Result<User, HydrationError> {
        get_one(self.runner, GET_BY_ID, id)
    }

    pub fn get_all(&self) -> Result<Vec<User>, HydrationError> {
        get_many(self.runner, GET_ALL, &[])
    }

    /// Users with any of the given ids, in id order. Missing ids are skipped.
    pub fn get_by_ids(&self, ids: &[EntityId]) -> Result<Vec<User>, HydrationError> {
        select_by_ids(self.runner, USER_TABLE, ids, self.chunk_size)
    }

    pub fn delete(&self, id: EntityId) -> Result<(), HydrationError> {
        self.runner.execute(DELETE, &[Value::BigInt(Some(id))])?;
        Ok(())
    }
}

impl<S: SqlRunner + ?Sized> RelatedSource<User> for UserDao<'_, S> {
    fn fetch_by_ids(&self, ids: &[EntityId]) -> Result<HashMap<EntityId, User>, HydrationError> {
        Ok(by_id(self.get_by_ids(ids)?))
    }
}
