//! Integration tests for the catalog against a real PostgreSQL.
//!
//! Set `BOOKSHELF_TEST_DATABASE_URL` to run them; without it every test
//! returns immediately. Tables are created in a throwaway `bookshelf_it`
//! schema.
//!
//! Test flow:
//! 1. Create the schema and tables
//! 2. Insert users, genres and books through the DAOs
//! 3. Hydrate with both strategies and compare
//! 4. Update and delete, then verify the join table

use bookshelf::{
    connect, Book, BookDao, BookService, FetchStrategy, Genre, GenreDao, HydrationConfig,
    HydrationError, MayPostgresRunner, SqlRunner, StorageError, User, UserDao,
};
use std::env;

const SCHEMA: &[&str] = &[
    "DROP SCHEMA IF EXISTS bookshelf_it CASCADE",
    "CREATE SCHEMA bookshelf_it",
    "SET search_path TO bookshelf_it",
    "CREATE TABLE users (id BIGSERIAL PRIMARY KEY, full_name TEXT NOT NULL)",
    "CREATE TABLE genre (id BIGSERIAL PRIMARY KEY, name TEXT NOT NULL)",
    "CREATE TABLE book (id BIGSERIAL PRIMARY KEY, title TEXT NOT NULL, year INT NOT NULL, \
     description TEXT NOT NULL DEFAULT '', author_id BIGINT REFERENCES users (id))",
    "CREATE TABLE book_genre (book_id BIGINT NOT NULL REFERENCES book (id) ON DELETE CASCADE, \
     genre_id BIGINT NOT NULL REFERENCES genre (id) ON DELETE CASCADE, \
     PRIMARY KEY (book_id, genre_id))",
];

fn runner() -> Option<MayPostgresRunner> {
    let Ok(url) = env::var("BOOKSHELF_TEST_DATABASE_URL") else {
        eprintln!("BOOKSHELF_TEST_DATABASE_URL not set, skipping");
        return None;
    };
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let runner = connect(&url).expect("connect to test database");
    for statement in SCHEMA {
        runner.execute(statement, &[]).expect("create test schema");
    }
    Some(runner)
}

fn sorted_genres(book: &Book) -> Vec<i64> {
    let mut ids = book.genre_ids();
    ids.sort_unstable();
    ids
}

#[test]
fn catalog_round_trip() {
    let Some(runner) = runner() else { return };

    let users = UserDao::new(&runner);
    let genres = GenreDao::new(&runner);
    let config = HydrationConfig { chunk_size: 4 };
    let books = BookDao::with_config(&runner, &config).unwrap();

    let mut pushkin = User::new(0, "Alexander Pushkin");
    let mut tolstoy = User::new(0, "Leo Tolstoy");
    users.insert(&mut pushkin).unwrap();
    users.insert(&mut tolstoy).unwrap();
    assert_eq!(users.count().unwrap(), 2);

    let mut catalog = Vec::new();
    for name in ["Poetry", "Novel", "History"] {
        let mut genre = Genre::new(0, name);
        genres.insert(&mut genre).unwrap();
        catalog.push(genre);
    }

    for i in 0..10 {
        let author = if i % 2 == 0 { pushkin.id } else { tolstoy.id };
        let linked: Vec<Genre> = catalog.iter().take(i % 4).cloned().collect();
        let mut book =
            Book::new(format!("Book {i}"), 1820 + i as i32, "", Some(author)).with_genres(linked);
        books.insert(&mut book).unwrap();
    }
    let mut orphan = Book::new("Anonymous", 1700, "no author", None);
    books.insert(&mut orphan).unwrap();
    assert_eq!(books.count().unwrap(), 11);

    // Both strategies agree.
    let mut by_select = books.get_all().unwrap();
    let mut by_subselect = by_select.clone();
    books.load_genres(&mut by_select, FetchStrategy::Select).unwrap();
    books.load_genres(&mut by_subselect, FetchStrategy::SubSelect).unwrap();
    for (a, b) in by_select.iter().zip(&by_subselect) {
        assert_eq!(sorted_genres(a), sorted_genres(b), "book {}", a.id);
    }

    // The single join query agrees with hydration.
    let joined = books.get_all_with_genres().unwrap();
    assert_eq!(joined.len(), by_select.len());
    for (a, b) in joined.iter().zip(&by_select) {
        assert_eq!(sorted_genres(a), sorted_genres(b), "book {}", a.id);
    }

    // Service hydrates authors too.
    let service = BookService::with_config(&runner, &config).unwrap();
    let all = service.get_all().unwrap();
    assert_eq!(all.len(), 11);
    let first = all.iter().find(|b| b.title == "Book 0").unwrap();
    assert_eq!(first.author.as_ref().unwrap().full_name, "Alexander Pushkin");
    assert_eq!(first.genres, Some(vec![]));
    let loaded_orphan = all.iter().find(|b| b.id == orphan.id).unwrap();
    assert!(loaded_orphan.author.is_none());

    // Genre queries
    let poetry = catalog[0].id;
    let with_poetry = books.get_all_by_genres(&[poetry, catalog[1].id]).unwrap();
    assert_eq!(with_poetry.len(), 7);
    assert_eq!(books.get_all_by_author_id(tolstoy.id).unwrap().len(), 5);

    // Reconcile genres on update.
    let mut edited = service.get_by_id(by_select[3].id).unwrap();
    assert_eq!(sorted_genres(&edited), vec![catalog[0].id, catalog[1].id, catalog[2].id]);
    edited.genres = Some(vec![catalog[2].clone()]);
    service.update(&edited).unwrap();
    assert_eq!(service.get_by_id(edited.id).unwrap().genre_ids(), vec![catalog[2].id]);

    edited.genres = Some(vec![]);
    service.update(&edited).unwrap();
    assert_eq!(service.get_by_id(edited.id).unwrap().genres, Some(vec![]));

    // Delete
    service.delete(edited.id).unwrap();
    let err = service.get_by_id(edited.id).unwrap_err();
    assert!(matches!(err, HydrationError::Storage(StorageError::NoRows)));
    assert_eq!(books.count().unwrap(), 10);

    // Concurrent readers, one runner per coroutine.
    let url = env::var("BOOKSHELF_TEST_DATABASE_URL").unwrap();
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let url = url.clone();
            may::go!(move || {
                let runner = connect(&url).unwrap();
                runner.execute("SET search_path TO bookshelf_it", &[]).unwrap();
                let service = BookService::new(&runner)
                    .unwrap()
                    .with_strategy(FetchStrategy::SubSelect);
                service.get_all().unwrap().len()
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), 10);
    }
}
