use super::{
    author_relation, count, expect_one_affected, genres_relation, get_many, get_one,
    insert_returning_id, BOOK_GENRE_TABLE, BOOK_TABLE,
};
use crate::config::HydrationConfig;
use crate::domain::{Book, Genre, User};
use crate::entity::EntityId;
use crate::error::{ConfigurationError, HydrationError};
use crate::executor::SqlRunner;
use crate::relation::{FetchStrategy, HasOneRelation, ManyToManyRelation, RelatedSource};
use crate::row::{FromRow, RawRow};
use crate::sql::{id_values, name};
use sea_query::{Asterisk, Expr, ExprTrait, Order, PostgresQueryBuilder, Query, Value};
use std::collections::{HashMap, HashSet};

const COUNT: &str = "SELECT count(*) AS count FROM book";
const INSERT: &str = "INSERT INTO book (title, year, description, author_id) \
     VALUES ($1, $2, $3, $4) RETURNING id";
const UPDATE: &str = "UPDATE book SET title = $2, year = $3, description = $4, author_id = $5 \
     WHERE id = $1";
const GET_BY_ID: &str = "SELECT id, title, year, description, author_id FROM book WHERE id = $1";
const GET_ALL: &str = "SELECT id, title, year, description, author_id FROM book ORDER BY id";
const GET_ALL_BY_AUTHOR: &str =
    "SELECT id, title, year, description, author_id FROM book WHERE author_id = $1 ORDER BY id";
const GET_ALL_WITH_GENRES: &str = "SELECT b.id, b.title, b.year, b.description, b.author_id, \
     g.id AS genre_id, g.name AS genre_name \
     FROM book b \
     LEFT JOIN book_genre bg ON bg.book_id = b.id \
     LEFT JOIN genre g ON g.id = bg.genre_id \
     ORDER BY b.id, g.id";
const DELETE: &str = "DELETE FROM book WHERE id = $1";

const LINK_GENRE: &str = "INSERT INTO book_genre (book_id, genre_id) VALUES ($1, $2)";
const LINK_MISSING_GENRE: &str = "INSERT INTO book_genre (book_id, genre_id) \
     SELECT $1::bigint, $2::bigint \
     WHERE NOT EXISTS (SELECT 1 FROM book_genre WHERE book_id = $1 AND genre_id = $2)";
const UNLINK_ALL_GENRES: &str = "DELETE FROM book_genre WHERE book_id = $1";

/// Access to the `book` table and its `book_genre` links.
///
/// Rows come back without their relations; use [`BookDao::load_authors`] and
/// [`BookDao::load_genres`] to hydrate a batch.
pub struct BookDao<'a, S: SqlRunner + ?Sized> {
    runner: &'a S,
    authors: HasOneRelation<Book, User>,
    genres: ManyToManyRelation<Book, Genre>,
}

impl<'a, S: SqlRunner + ?Sized> BookDao<'a, S> {
    /// # Errors
    ///
    /// Propagates relation setup errors.
    pub fn new(runner: &'a S) -> Result<Self, ConfigurationError> {
        Self::with_config(runner, &HydrationConfig::default())
    }

    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidChunkSize` for a zero chunk size.
    pub fn with_config(
        runner: &'a S,
        config: &HydrationConfig,
    ) -> Result<Self, ConfigurationError> {
        Ok(Self {
            runner,
            authors: author_relation()?,
            genres: genres_relation(config.chunk_size)?,
        })
    }

    pub fn count(&self) -> Result<i64, HydrationError> {
        count(self.runner, COUNT)
    }

    /// Store a new book with its genre links and write the generated id back.
    pub fn insert(&self, book: &mut Book) -> Result<(), HydrationError> {
        book.id = insert_returning_id(self.runner, INSERT, &row_values(book))?;
        for genre_id in distinct_genre_ids(book) {
            self.runner.execute(LINK_GENRE, &link_values(book.id, genre_id))?;
        }
        log::debug!("inserted book {} with {} genres", book.id, book.genre_ids().len());
        Ok(())
    }

    /// Update the book row and, when `genres` is loaded, make the stored links
    /// match it exactly. Unloaded genres leave the links untouched.
    ///
    /// # Errors
    ///
    /// `StorageError::NoRows` when no book has this id.
    pub fn update(&self, book: &Book) -> Result<(), HydrationError> {
        let mut values = vec![Value::BigInt(Some(book.id))];
        values.extend(row_values(book));
        let affected = self.runner.execute(UPDATE, &values)?;
        expect_one_affected(affected, "book", book.id)?;

        if book.genres.is_some() {
            self.reconcile_genres(book)?;
        }
        Ok(())
    }

    fn reconcile_genres(&self, book: &Book) -> Result<(), HydrationError> {
        let keep = distinct_genre_ids(book);
        for genre_id in &keep {
            self.runner.execute(LINK_MISSING_GENRE, &link_values(book.id, *genre_id))?;
        }

        let removed = if keep.is_empty() {
            self.runner.execute(UNLINK_ALL_GENRES, &[Value::BigInt(Some(book.id))])?
        } else {
            let (sql, values) = Query::delete()
                .from_table(name(BOOK_GENRE_TABLE))
                .and_where(Expr::col(name("book_id")).eq(book.id))
                .and_where(Expr::col(name("genre_id")).is_not_in(id_values(&keep)))
                .build(PostgresQueryBuilder);
            self.runner.execute(&sql, &values.0)?
        };
        log::debug!("book {}: {} genre links kept, {removed} removed", book.id, keep.len());
        Ok(())
    }

    /// # Errors
    ///
    /// `StorageError::NoRows` when no book has this id.
    pub fn get_by_id(&self, id: EntityId) -> Result<Book, HydrationError> {
        get_one(self.runner, GET_BY_ID, id)
    }

    pub fn get_all(&self) -> Result<Vec<Book>, HydrationError> {
        get_many(self.runner, GET_ALL, &[])
    }

    /// Every book with its genres, fetched in a single `LEFT JOIN` query.
    ///
    /// Rows are grouped by book id in id order. Books without genres get an
    /// empty set, as with [`BookDao::load_genres`].
    pub fn get_all_with_genres(&self) -> Result<Vec<Book>, HydrationError> {
        let rows = self.runner.query_all(GET_ALL_WITH_GENRES, &[])?;
        let mut books: Vec<Book> = Vec::new();
        let mut positions: HashMap<EntityId, usize> = HashMap::new();

        for row in &rows {
            let id = row.required_i64("id")?;
            let pos = match positions.get(&id) {
                Some(pos) => *pos,
                None => {
                    books.push(Book::from_row(row)?.with_genres(Vec::new()));
                    positions.insert(id, books.len() - 1);
                    books.len() - 1
                }
            };
            if let Some(genre_id) = row.get_i64("genre_id")? {
                let genre = Genre::new(genre_id, row.required_string("genre_name")?);
                books[pos].genres.get_or_insert_with(Vec::new).push(genre);
            }
        }

        log::debug!("join-fetched {} books from {} rows", books.len(), rows.len());
        Ok(books)
    }

    pub fn get_all_by_author_id(&self, author_id: EntityId) -> Result<Vec<Book>, HydrationError> {
        get_many(self.runner, GET_ALL_BY_AUTHOR, &[Value::BigInt(Some(author_id))])
    }

    /// Books linked to any of `genre_ids`, each book once.
    pub fn get_all_by_genres(&self, genre_ids: &[EntityId]) -> Result<Vec<Book>, HydrationError> {
        if genre_ids.is_empty() {
            return Ok(Vec::new());
        }
        let (sql, values) = Query::select()
            .distinct()
            .column((name(BOOK_TABLE), Asterisk))
            .from(name(BOOK_TABLE))
            .inner_join(
                name(BOOK_GENRE_TABLE),
                Expr::col((name(BOOK_TABLE), name("id")))
                    .equals((name(BOOK_GENRE_TABLE), name("book_id"))),
            )
            .and_where(
                Expr::col((name(BOOK_GENRE_TABLE), name("genre_id"))).is_in(id_values(genre_ids)),
            )
            .order_by((name(BOOK_TABLE), name("id")), Order::Asc)
            .build(PostgresQueryBuilder);
        get_many(self.runner, &sql, &values.0)
    }

    /// Links in `book_genre` go with the book.
    pub fn delete(&self, id: EntityId) -> Result<(), HydrationError> {
        self.runner.execute(DELETE, &[Value::BigInt(Some(id))])?;
        Ok(())
    }

    /// Attach each book's author from `source`.
    pub fn load_authors<R>(&self, books: &mut [Book], source: &R) -> Result<(), HydrationError>
    where
        R: RelatedSource<User> + ?Sized,
    {
        self.authors.load(books, source)
    }

    /// Attach each book's genres using `strategy`.
    pub fn load_genres(
        &self,
        books: &mut [Book],
        strategy: FetchStrategy,
    ) -> Result<(), HydrationError> {
        self.genres.load(books, self.runner, strategy)
    }
}

fn row_values(book: &Book) -> Vec<Value> {
    vec![
        Value::from(book.title.clone()),
        Value::Int(Some(book.year)),
        Value::from(book.description.clone()),
        Value::BigInt(book.author_id),
    ]
}

fn link_values(book_id: EntityId, genre_id: EntityId) -> [Value; 2] {
    [Value::BigInt(Some(book_id)), Value::BigInt(Some(genre_id))]
}

fn distinct_genre_ids(book: &Book) -> Vec<EntityId> {
    let mut seen = HashSet::new();
    book.genre_ids().into_iter().filter(|id| seen.insert(*id)).collect()
}
