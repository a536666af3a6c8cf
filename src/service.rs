//! Book catalog service on top of the DAOs.

use crate::config::HydrationConfig;
use crate::dao::{BookDao, UserDao};
use crate::domain::Book;
use crate::entity::EntityId;
use crate::error::{ConfigurationError, HydrationError};
use crate::executor::SqlRunner;
use crate::relation::FetchStrategy;

/// Books with their authors and genres.
///
/// Reads hydrate relations in bulk: one author lookup per chunk of distinct
/// author ids and one genre query per chunk of books (or a single subselect
/// query with [`FetchStrategy::SubSelect`]).
pub struct BookService<'a, S: SqlRunner + ?Sized> {
    books: BookDao<'a, S>,
    users: UserDao<'a, S>,
    strategy: FetchStrategy,
}

impl<'a, S: SqlRunner + ?Sized> BookService<'a, S> {
    pub fn new(runner: &'a S) -> Result<Self, ConfigurationError> {
        Self::with_config(runner, &HydrationConfig::default())
    }

    pub fn with_config(
        runner: &'a S,
        config: &HydrationConfig,
    ) -> Result<Self, ConfigurationError> {
        Ok(Self {
            books: BookDao::with_config(runner, config)?,
            users: UserDao::with_config(runner, config)?,
            strategy: FetchStrategy::default(),
        })
    }

    /// Genre fetch strategy used by reads. Defaults to [`FetchStrategy::Select`].
    #[must_use]
    pub fn with_strategy(mut self, strategy: FetchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn strategy(&self) -> FetchStrategy {
        self.strategy
    }

    pub fn add(&self, book: &mut Book) -> Result<(), HydrationError> {
        self.books.insert(book)
    }

    pub fn update(&self, book: &Book) -> Result<(), HydrationError> {
        self.books.update(book)
    }

    /// One book with author and genres attached.
    pub fn get_by_id(&self, id: EntityId) -> Result<Book, HydrationError> {
        let mut books = vec![self.books.get_by_id(id)?];
        self.hydrate(&mut books)?;
        Ok(books.remove(0))
    }

    /// Every book with author and genres attached.
    pub fn get_all(&self) -> Result<Vec<Book>, HydrationError> {
        let mut books = self.books.get_all()?;
        self.hydrate(&mut books)?;
        log::debug!("loaded {} books ({})", books.len(), self.strategy.as_str());
        Ok(books)
    }

    pub fn get_all_by_author_id(&self, author_id: EntityId) -> Result<Vec<Book>, HydrationError> {
        let mut books = self.books.get_all_by_author_id(author_id)?;
        self.hydrate(&mut books)?;
        Ok(books)
    }

    pub fn get_all_by_genres(&self, genre_ids: &[EntityId]) -> Result<Vec<Book>, HydrationError> {
        let mut books = self.books.get_all_by_genres(genre_ids)?;
        self.hydrate(&mut books)?;
        Ok(books)
    }

    pub fn delete(&self, id: EntityId) -> Result<(), HydrationError> {
        self.books.delete(id)
    }

    fn hydrate(&self, books: &mut [Book]) -> Result<(), HydrationError> {
        self.books.load_authors(books, &self.users)?;
        self.books.load_genres(books, self.strategy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Genre, User};
    use crate::executor::StorageError;
    use crate::row::MemoryRow;
    use crate::test_helpers::MemoryRunner;
    use sea_query::Value;

    fn book_row(id: i64, author_id: Option<i64>) -> MemoryRow {
        MemoryRow::new()
            .with("id", id)
            .with("title", format!("book {id}"))
            .with("year", 1900i32)
            .with("description", "")
            .with("author_id", Value::BigInt(author_id))
    }

    fn catalog() -> MemoryRunner {
        let runner = MemoryRunner::new();
        runner.add_genre(Genre::new(1, "Poetry"));
        runner.add_genre(Genre::new(2, "Prose"));
        for id in 1..=3 {
            runner.add_book(id);
        }
        runner.link(1, 1);
        runner.link(1, 2);
        runner.link(2, 2);
        runner
    }

    #[test]
    fn test_get_all_hydrates_authors_and_genres() {
        let runner = catalog();
        runner.push_result(vec![book_row(1, Some(10)), book_row(2, Some(10)), book_row(3, None)]);
        runner.push_result(vec![MemoryRow::new()
            .with("id", 10i64)
            .with("full_name", "A. Pushkin")]);

        let books = BookService::new(&runner).unwrap().get_all().unwrap();

        assert_eq!(books.len(), 3);
        assert_eq!(books[0].author, Some(User::new(10, "A. Pushkin")));
        assert_eq!(books[1].author, books[0].author);
        assert_eq!(books[2].author, None);
        assert_eq!(books[0].genre_ids().len(), 2);
        assert_eq!(books[1].genre_ids(), vec![2]);
        assert_eq!(books[2].genres, Some(vec![]));
        // books, authors, genres
        assert_eq!(runner.query_count(), 3);
    }

    #[test]
    fn test_get_all_with_subselect_matches_select() {
        let select_runner = catalog();
        select_runner.push_result(vec![book_row(1, None), book_row(2, None), book_row(3, None)]);
        let by_select = BookService::new(&select_runner).unwrap().get_all().unwrap();

        let subselect_runner = catalog();
        subselect_runner.push_result(vec![book_row(1, None), book_row(2, None), book_row(3, None)]);
        let service = BookService::new(&subselect_runner)
            .unwrap()
            .with_strategy(FetchStrategy::SubSelect);
        assert_eq!(service.strategy(), FetchStrategy::SubSelect);
        let by_subselect = service.get_all().unwrap();

        for (a, b) in by_select.iter().zip(&by_subselect) {
            let mut x = a.genre_ids();
            let mut y = b.genre_ids();
            x.sort_unstable();
            y.sort_unstable();
            assert_eq!(x, y);
        }
        assert!(subselect_runner.statements()[1].sql.contains("IN (SELECT"));
    }

    #[test]
    fn test_get_by_id_hydrates_single_book() {
        let runner = catalog();
        runner.push_result(vec![book_row(2, None)]);
        let book = BookService::new(&runner).unwrap().get_by_id(2).unwrap();
        assert_eq!(book.genres, Some(vec![Genre::new(2, "Prose")]));
        assert!(book.author.is_none());
    }

    #[test]
    fn test_get_by_id_missing() {
        let runner = catalog();
        let err = BookService::new(&runner).unwrap().get_by_id(99).unwrap_err();
        assert!(matches!(err, HydrationError::Storage(StorageError::NoRows)));
    }

    #[test]
    fn test_genre_failure_propagates() {
        let runner = catalog();
        runner.push_result(vec![book_row(1, None)]);
        runner.fail_query(2);
        let err = BookService::new(&runner).unwrap().get_all().unwrap_err();
        assert!(matches!(err, HydrationError::Storage(StorageError::Query(_))));
    }
}
