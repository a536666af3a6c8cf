//! In-memory storage for exercising hydration without a database.
//!
//! [`MemoryRunner`] records every statement it receives and answers the
//! `book_genre` join queries built by the genre relation from an in-memory
//! join table. Any other query returns the next scripted result, or no rows.

use crate::domain::Genre;
use crate::entity::EntityId;
use crate::executor::{SqlRunner, StorageError};
use crate::relation::PARENT_ID_COLUMN;
use crate::row::MemoryRow;
use sea_query::Value;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet, VecDeque};

/// A statement as received by [`MemoryRunner`].
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

#[derive(Default)]
struct State {
    books: Vec<EntityId>,
    genres: BTreeMap<EntityId, Genre>,
    links: Vec<(EntityId, EntityId)>,
    scripted: VecDeque<Vec<MemoryRow>>,
    statements: Vec<Statement>,
    fail_on: Option<usize>,
}

/// Single-threaded [`SqlRunner`] backed by memory.
#[derive(Default)]
pub struct MemoryRunner {
    state: RefCell<State>,
}

impl MemoryRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a row in the parent (`book`) table.
    pub fn add_book(&self, id: EntityId) {
        self.state.borrow_mut().books.push(id);
    }

    pub fn add_genre(&self, genre: Genre) {
        self.state.borrow_mut().genres.insert(genre.id, genre);
    }

    /// Add a `(book_id, genre_id)` row to the join table. Duplicates are kept.
    pub fn link(&self, book_id: EntityId, genre_id: EntityId) {
        self.state.borrow_mut().links.push((book_id, genre_id));
    }

    /// Queue rows returned by the next query that is not a join query.
    pub fn push_result(&self, rows: Vec<MemoryRow>) {
        self.state.borrow_mut().scripted.push_back(rows);
    }

    /// Make the `n`th statement (1-based) fail with `StorageError::Query`.
    pub fn fail_query(&self, n: usize) {
        self.state.borrow_mut().fail_on = Some(n);
    }

    pub fn statements(&self) -> Vec<Statement> {
        self.state.borrow().statements.clone()
    }

    pub fn query_count(&self) -> usize {
        self.state.borrow().statements.len()
    }

    fn record(&self, sql: &str, params: &[Value]) -> Result<(), StorageError> {
        let mut state = self.state.borrow_mut();
        state.statements.push(Statement {
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        let n = state.statements.len();
        if state.fail_on == Some(n) {
            return Err(StorageError::Query(format!("injected failure on statement {n}")));
        }
        Ok(())
    }

    fn join_rows(&self, sql: &str, params: &[Value]) -> Vec<MemoryRow> {
        let state = self.state.borrow();
        let parents: HashSet<EntityId> = if sql.contains("IN (SELECT") {
            state.books.iter().copied().collect()
        } else {
            params
                .iter()
                .filter_map(|v| match v {
                    Value::BigInt(Some(id)) => Some(*id),
                    _ => None,
                })
                .collect()
        };

        state
            .links
            .iter()
            .filter(|(book_id, _)| parents.contains(book_id))
            .filter_map(|(book_id, genre_id)| {
                state.genres.get(genre_id).map(|g| {
                    MemoryRow::new()
                        .with(PARENT_ID_COLUMN, *book_id)
                        .with("id", g.id)
                        .with("name", g.name.clone())
                })
            })
            .collect()
    }
}

impl SqlRunner for MemoryRunner {
    type Row = MemoryRow;

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, StorageError> {
        self.record(sql, params)?;
        Ok(1)
    }

    fn query_all(&self, sql: &str, params: &[Value]) -> Result<Vec<MemoryRow>, StorageError> {
        self.record(sql, params)?;
        if sql.contains(&format!(r#"AS "{PARENT_ID_COLUMN}""#)) && sql.contains(r#""book_genre""#) {
            return Ok(self.join_rows(sql, params));
        }
        Ok(self.state.borrow_mut().scripted.pop_front().unwrap_or_default())
    }
}
