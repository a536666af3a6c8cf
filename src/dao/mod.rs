//! Data-access objects for the catalog tables.
//!
//! Each DAO borrows a [`SqlRunner`](crate::executor::SqlRunner) and maps rows
//! with [`FromRow`](crate::row::FromRow). Fixed statements are plain
//! parameterized SQL; statements with id lists are built with `sea_query`.
//!
//! Schema:
//!
//! ```sql
//! CREATE TABLE users (id BIGSERIAL PRIMARY KEY, full_name TEXT NOT NULL);
//! CREATE TABLE genre (id BIGSERIAL PRIMARY KEY, name TEXT NOT NULL);
//! CREATE TABLE book (
//!     id BIGSERIAL PRIMARY KEY,
//!     title TEXT NOT NULL,
//!     year INT NOT NULL,
//!     description TEXT NOT NULL DEFAULT '',
//!     author_id BIGINT REFERENCES users (id)
//! );
//! CREATE TABLE book_genre (
//!     book_id BIGINT NOT NULL REFERENCES book (id) ON DELETE CASCADE,
//!     genre_id BIGINT NOT NULL REFERENCES genre (id) ON DELETE CASCADE,
//!     PRIMARY KEY (book_id, genre_id)
//! );
//! ```

mod book;
mod genre;
mod user;

pub use book::BookDao;
pub use genre::GenreDao;
pub use user::UserDao;

use crate::chunk::chunk;
use crate::domain::{Book, Genre, User};
use crate::entity::{Entity, EntityId};
use crate::error::{ConfigurationError, HydrationError};
use crate::executor::{SqlRunner, StorageError};
use crate::relation::{HasOneRelation, ManyToManyRelation};
use crate::row::{FromRow, RawRow};
use crate::sql::{id_values, name};
use sea_query::{Asterisk, Expr, ExprTrait, Order, PostgresQueryBuilder, Query, Value};
use std::collections::HashMap;

pub(crate) const BOOK_TABLE: &str = "book";
pub(crate) const GENRE_TABLE: &str = "genre";
pub(crate) const USER_TABLE: &str = "users";
pub(crate) const BOOK_GENRE_TABLE: &str = "book_genre";

/// The `book -> genre` relation through `book_genre`.
///
/// # Errors
///
/// Returns `ConfigurationError::InvalidChunkSize` for a zero chunk size.
pub fn genres_relation(
    chunk_size: usize,
) -> Result<ManyToManyRelation<Book, Genre>, ConfigurationError> {
    ManyToManyRelation::builder()
        .join_table(BOOK_GENRE_TABLE)
        .parent_column("book_id")
        .related_column("genre_id")
        .related_table(GENRE_TABLE)
        .parent_table(BOOK_TABLE)
        .chunk_size(chunk_size)
        .setter(|book: &mut Book, genres| book.genres = Some(genres))
        .build()
}

/// The `book -> users` relation through `book.author_id`.
///
/// # Errors
///
/// Never fails in practice; the builder result is passed through.
pub fn author_relation() -> Result<HasOneRelation<Book, User>, ConfigurationError> {
    HasOneRelation::builder()
        .foreign_key(|book: &Book| book.author_id)
        .setter(|book: &mut Book, user| book.author = Some(user))
        .build()
}

/// Fetch rows of `table` whose `id` is in `ids`, one query per chunk.
pub(crate) fn select_by_ids<S, T>(
    runner: &S,
    table: &str,
    ids: &[EntityId],
    chunk_size: usize,
) -> Result<Vec<T>, HydrationError>
where
    S: SqlRunner + ?Sized,
    T: FromRow,
{
    let mut found = Vec::new();
    for part in chunk(ids, chunk_size)? {
        let (sql, values) = Query::select()
            .column(Asterisk)
            .from(name(table))
            .and_where(Expr::col(name("id")).is_in(id_values(&part)))
            .order_by(name("id"), Order::Asc)
            .build(PostgresQueryBuilder);
        for row in runner.query_all(&sql, &values.0)? {
            found.push(T::from_row(&row)?);
        }
    }
    Ok(found)
}

/// Key fetched entities by identity for a [`RelatedSource`](crate::relation::RelatedSource).
pub(crate) fn by_id<T: Entity>(entities: Vec<T>) -> HashMap<EntityId, T> {
    entities.into_iter().map(|e| (e.id(), e)).collect()
}

/// Run an `INSERT ... RETURNING id` and read the generated id.
pub(crate) fn insert_returning_id<S>(
    runner: &S,
    sql: &str,
    params: &[Value],
) -> Result<EntityId, HydrationError>
where
    S: SqlRunner + ?Sized,
{
    let row = runner.query_one(sql, params)?;
    Ok(row.required_i64("id")?)
}

/// Read a `count(*)` column.
pub(crate) fn count<S>(runner: &S, sql: &str) -> Result<i64, HydrationError>
where
    S: SqlRunner + ?Sized,
{
    let row = runner.query_one(sql, &[])?;
    Ok(row.required_i64("count")?)
}

/// Map a single row or report `StorageError::NoRows`.
pub(crate) fn get_one<S, T>(runner: &S, sql: &str, id: EntityId) -> Result<T, HydrationError>
where
    S: SqlRunner + ?Sized,
    T: FromRow,
{
    let row = runner.query_one(sql, &[Value::BigInt(Some(id))])?;
    Ok(T::from_row(&row)?)
}

pub(crate) fn get_many<S, T>(
    runner: &S,
    sql: &str,
    params: &[Value],
) -> Result<Vec<T>, HydrationError>
where
    S: SqlRunner + ?Sized,
    T: FromRow,
{
    runner
        .query_all(sql, params)?
        .iter()
        .map(|row| T::from_row(row).map_err(HydrationError::from))
        .collect()
}

/// Statements that must touch exactly one row.
pub(crate) fn expect_one_affected(
    affected: u64,
    what: &str,
    id: EntityId,
) -> Result<(), HydrationError> {
    if affected == 0 {
        log::debug!("{what} {id} not found");
        return Err(StorageError::NoRows.into());
    }
    Ok(())
}
