//! Many-to-many hydration through a join table.
//!
//! The loader owns the join query, since the join table has no entity of its
//! own. Both strategies produce rows of `(parent_id, related columns...)`:
//!
//! ```sql
//! SELECT j.parent_col AS parent_id, r.*
//! FROM join_table j INNER JOIN related_table r ON j.related_col = r.related_key
//! WHERE j.parent_col IN ($1, ..., $n)                      -- FetchStrategy::Select
//! WHERE j.parent_col IN (SELECT parent_key FROM parent)    -- FetchStrategy::SubSelect
//! ```
//!
//! `Select` issues one query per chunk of parent ids; `SubSelect` issues a
//! single query and lets the database restrict the rows. Rows from every
//! chunk are collected before any parent is touched, then merged with
//! [`merge_join_rows`].

use crate::chunk::chunk;
use crate::config::HydrationConfig;
use crate::entity::{Entity, EntityId};
use crate::error::{ConfigurationError, HydrationError};
use crate::executor::SqlRunner;
use crate::relation::merge::{merge_join_rows, JoinRow, PARENT_ID_COLUMN};
use crate::row::FromRow;
use crate::sql::{id_values, name};
use sea_query::{Asterisk, Expr, ExprTrait, PostgresQueryBuilder, Query, SelectStatement};
use std::collections::HashSet;

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;
#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

type Setter<P, R> = Box<dyn Fn(&mut P, Vec<R>) + Send + Sync>;

/// How the join rows for a batch are fetched.
///
/// Both produce the same parent to related-set assignment; only the number
/// and shape of queries differ.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FetchStrategy {
    /// One query per chunk of parent ids, filtered with `IN (...)`.
    #[default]
    Select,
    /// One query filtered with `IN (SELECT id FROM parent_table)`.
    SubSelect,
}

impl FetchStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            FetchStrategy::Select => "select",
            FetchStrategy::SubSelect => "subselect",
        }
    }
}

/// Descriptor of a many-to-many relation from `P` to `R`.
///
/// # Example
///
/// ```
/// use bookshelf::{Book, Genre, ManyToManyRelation};
///
/// let genres = ManyToManyRelation::<Book, Genre>::builder()
///     .join_table("book_genre")
///     .parent_column("book_id")
///     .related_column("genre_id")
///     .related_table("genre")
///     .parent_table("book")
///     .setter(|book, genres| book.genres = Some(genres))
///     .build()
///     .unwrap();
/// assert_eq!(genres.chunk_size(), 25);
/// ```
pub struct ManyToManyRelation<P, R> {
    join_table: String,
    parent_column: String,
    related_column: String,
    related_table: String,
    related_key: String,
    parent_table: String,
    parent_key: String,
    chunk_size: usize,
    dedupe_related: bool,
    setter: Setter<P, R>,
}

impl<P, R> ManyToManyRelation<P, R> {
    pub fn builder() -> ManyToManyRelationBuilder<P, R> {
        ManyToManyRelationBuilder::default()
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Join query restricted to the given parent ids.
    pub fn batched_select(&self, parent_ids: &[EntityId]) -> SelectStatement {
        let mut query = self.base_select();
        query.and_where(
            Expr::col((name(&self.join_table), name(&self.parent_column)))
                .is_in(id_values(parent_ids)),
        );
        query
    }

    /// Join query restricted to every row of the parent table.
    pub fn subselect(&self) -> SelectStatement {
        let parents = Query::select()
            .column(name(&self.parent_key))
            .from(name(&self.parent_table))
            .to_owned();
        let mut query = self.base_select();
        query.and_where(
            Expr::col((name(&self.join_table), name(&self.parent_column))).in_subquery(parents),
        );
        query
    }

    fn base_select(&self) -> SelectStatement {
        Query::select()
            .expr_as(
                Expr::col((name(&self.join_table), name(&self.parent_column))),
                name(PARENT_ID_COLUMN),
            )
            .column((name(&self.related_table), Asterisk))
            .from(name(&self.join_table))
            .inner_join(
                name(&self.related_table),
                Expr::col((name(&self.join_table), name(&self.related_column)))
                    .equals((name(&self.related_table), name(&self.related_key))),
            )
            .to_owned()
    }
}

impl<P, R> ManyToManyRelation<P, R>
where
    P: Entity,
    R: Entity + FromRow + Clone,
{
    /// Attach the related set of every parent in place.
    ///
    /// Parents without join rows receive an empty set. An empty batch issues
    /// no query.
    ///
    /// # Errors
    ///
    /// Returns the first storage or mapping error. Parents are only mutated
    /// after every query has succeeded.
    pub fn load<S>(
        &self,
        parents: &mut [P],
        runner: &S,
        strategy: FetchStrategy,
    ) -> Result<(), HydrationError>
    where
        S: SqlRunner + ?Sized,
    {
        if parents.is_empty() {
            return Ok(());
        }

        #[cfg(feature = "tracing")]
        let _span =
            tracing_helpers::hydration_span(&self.join_table, strategy.as_str(), parents.len())
                .entered();

        let rows = match strategy {
            FetchStrategy::Select => self.fetch_batched(parents, runner)?,
            FetchStrategy::SubSelect => self.fetch_subselect(runner)?,
        };

        log::debug!(
            "many-to-many {}: {} join rows for {} parents ({})",
            self.join_table,
            rows.len(),
            parents.len(),
            strategy.as_str()
        );

        merge_join_rows(parents, rows, self.dedupe_related, |p, set| (self.setter)(p, set));
        Ok(())
    }

    fn fetch_batched<S>(&self, parents: &[P], runner: &S) -> Result<Vec<JoinRow<R>>, HydrationError>
    where
        S: SqlRunner + ?Sized,
    {
        let mut seen = HashSet::new();
        let ids: Vec<EntityId> = parents
            .iter()
            .map(Entity::id)
            .filter(|id| seen.insert(*id))
            .collect();
        let chunks = chunk(&ids, self.chunk_size)?;

        #[cfg(feature = "metrics")]
        METRICS.record_hydration_chunks(chunks.len() as u64);

        let mut rows = Vec::new();
        for part in &chunks {
            rows.extend(self.run(runner, self.batched_select(part))?);
        }
        Ok(rows)
    }

    fn fetch_subselect<S>(&self, runner: &S) -> Result<Vec<JoinRow<R>>, HydrationError>
    where
        S: SqlRunner + ?Sized,
    {
        self.run(runner, self.subselect())
    }

    fn run<S>(&self, runner: &S, query: SelectStatement) -> Result<Vec<JoinRow<R>>, HydrationError>
    where
        S: SqlRunner + ?Sized,
    {
        let (sql, values) = query.build(PostgresQueryBuilder);
        let rows = runner.query_all(&sql, &values.0)?;
        let joined = rows
            .iter()
            .map(JoinRow::<R>::from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(joined)
    }
}

/// Builder for [`ManyToManyRelation`].
///
/// Table and column names and the setter are required. `related_key` and
/// `parent_key` default to `id`, the chunk size to
/// [`DEFAULT_CHUNK_SIZE`](crate::chunk::DEFAULT_CHUNK_SIZE).
pub struct ManyToManyRelationBuilder<P, R> {
    join_table: Option<String>,
    parent_column: Option<String>,
    related_column: Option<String>,
    related_table: Option<String>,
    related_key: String,
    parent_table: Option<String>,
    parent_key: String,
    chunk_size: usize,
    dedupe_related: bool,
    setter: Option<Setter<P, R>>,
}

impl<P, R> Default for ManyToManyRelationBuilder<P, R> {
    fn default() -> Self {
        Self {
            join_table: None,
            parent_column: None,
            related_column: None,
            related_table: None,
            related_key: "id".to_string(),
            parent_table: None,
            parent_key: "id".to_string(),
            chunk_size: HydrationConfig::default().chunk_size,
            dedupe_related: false,
            setter: None,
        }
    }
}

impl<P, R> ManyToManyRelationBuilder<P, R> {
    #[must_use]
    pub fn join_table(mut self, table: impl Into<String>) -> Self {
        self.join_table = Some(table.into());
        self
    }

    /// Join-table column referencing the parent.
    #[must_use]
    pub fn parent_column(mut self, column: impl Into<String>) -> Self {
        self.parent_column = Some(column.into());
        self
    }

    /// Join-table column referencing the related entity.
    #[must_use]
    pub fn related_column(mut self, column: impl Into<String>) -> Self {
        self.related_column = Some(column.into());
        self
    }

    #[must_use]
    pub fn related_table(mut self, table: impl Into<String>) -> Self {
        self.related_table = Some(table.into());
        self
    }

    #[must_use]
    pub fn related_key(mut self, column: impl Into<String>) -> Self {
        self.related_key = column.into();
        self
    }

    /// Parent table, used by the subselect strategy.
    #[must_use]
    pub fn parent_table(mut self, table: impl Into<String>) -> Self {
        self.parent_table = Some(table.into());
        self
    }

    #[must_use]
    pub fn parent_key(mut self, column: impl Into<String>) -> Self {
        self.parent_key = column.into();
        self
    }

    #[must_use]
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Take the chunk size from loaded settings.
    #[must_use]
    pub fn config(self, config: &HydrationConfig) -> Self {
        self.chunk_size(config.chunk_size)
    }

    /// Collapse repeated related ids per parent during the merge.
    #[must_use]
    pub fn dedupe_related(mut self, dedupe: bool) -> Self {
        self.dedupe_related = dedupe;
        self
    }

    #[must_use]
    pub fn setter<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut P, Vec<R>) + Send + Sync + 'static,
    {
        self.setter = Some(Box::new(f));
        self
    }

    /// # Errors
    ///
    /// Returns `ConfigurationError` for a missing or empty name, a missing
    /// setter or a zero chunk size.
    pub fn build(self) -> Result<ManyToManyRelation<P, R>, ConfigurationError> {
        use ConfigurationError::{MissingColumn, MissingTable};

        if self.chunk_size == 0 {
            return Err(ConfigurationError::InvalidChunkSize(self.chunk_size));
        }
        Ok(ManyToManyRelation {
            join_table: required(self.join_table, MissingTable("join"))?,
            parent_column: required(self.parent_column, MissingColumn("parent"))?,
            related_column: required(self.related_column, MissingColumn("related"))?,
            related_table: required(self.related_table, MissingTable("related"))?,
            related_key: required(Some(self.related_key), MissingColumn("related key"))?,
            parent_table: required(self.parent_table, MissingTable("parent"))?,
            parent_key: required(Some(self.parent_key), MissingColumn("parent key"))?,
            chunk_size: self.chunk_size,
            dedupe_related: self.dedupe_related,
            setter: self.setter.ok_or(ConfigurationError::MissingSetter)?,
        })
    }
}

fn required(value: Option<String>, err: ConfigurationError) -> Result<String, ConfigurationError> {
    value.filter(|v| !v.trim().is_empty()).ok_or(err)
}
