//! End-to-end hydration through the public API, backed by `MemoryRunner`.

use bookshelf::test_helpers::MemoryRunner;
use bookshelf::{
    Book, BookDao, BookService, EntityId, FetchStrategy, Genre, HasOneRelation, HydrationConfig,
    HydrationError, ManyToManyRelation, MemoryRow, User,
};
use fake::faker::lorem::en::Sentence;
use fake::faker::name::en::Name;
use fake::Fake;
use sea_query::Value;
use std::collections::HashMap;

fn stored_book(id: EntityId, author_id: Option<EntityId>) -> Book {
    let mut book = Book::new(Sentence(1..4).fake::<String>(), 1900 + id as i32, "", author_id);
    book.id = id;
    book
}

fn book_row(book: &Book) -> MemoryRow {
    MemoryRow::new()
        .with("id", book.id)
        .with("title", book.title.clone())
        .with("year", book.year)
        .with("description", book.description.clone())
        .with("author_id", Value::BigInt(book.author_id))
}

fn sorted_ids(book: &Book) -> Vec<EntityId> {
    let mut ids = book.genre_ids();
    ids.sort_unstable();
    ids
}

#[test]
fn hundred_books_hydrate_in_bounded_queries() {
    let runner = MemoryRunner::new();
    for g in 1..=5 {
        runner.add_genre(Genre::new(g, format!("genre {g}")));
    }
    let books: Vec<Book> = (1..=100).map(|id| stored_book(id, Some(id % 7 + 1))).collect();
    for book in &books {
        runner.add_book(book.id);
        for g in 1..=(book.id % 5) {
            runner.link(book.id, g);
        }
    }
    runner.push_result(books.iter().map(book_row).collect());
    let authors: Vec<MemoryRow> = (1..=7)
        .map(|id: i64| MemoryRow::new().with("id", id).with("full_name", Name().fake::<String>()))
        .collect();
    runner.push_result(authors);

    let loaded = BookService::new(&runner).unwrap().get_all().unwrap();

    // 1 list + 1 author lookup + 4 genre chunks of 25
    assert_eq!(runner.query_count(), 6);
    assert_eq!(loaded.len(), 100);
    for book in &loaded {
        assert_eq!(book.author.as_ref().map(|a| a.id), book.author_id);
        assert_eq!(sorted_ids(book), (1..=(book.id % 5)).collect::<Vec<_>>());
    }
}

#[test]
fn strategies_agree_through_dao() {
    let runner = MemoryRunner::new();
    for g in 1..=3 {
        runner.add_genre(Genre::new(g, format!("genre {g}")));
    }
    for id in 1..=30 {
        runner.add_book(id);
        runner.link(id, id % 3 + 1);
        if id % 4 == 0 {
            runner.link(id, (id + 1) % 3 + 1);
        }
    }

    let config = HydrationConfig { chunk_size: 7 };
    let dao = BookDao::with_config(&runner, &config).unwrap();
    let mut by_select: Vec<Book> = (1..=30).map(|id| stored_book(id, None)).collect();
    let mut by_subselect = by_select.clone();

    dao.load_genres(&mut by_select, FetchStrategy::Select).unwrap();
    let select_queries = runner.query_count();
    dao.load_genres(&mut by_subselect, FetchStrategy::SubSelect).unwrap();

    assert_eq!(select_queries, 5);
    assert_eq!(runner.query_count() - select_queries, 1);
    for (a, b) in by_select.iter().zip(&by_subselect) {
        assert_eq!(sorted_ids(a), sorted_ids(b));
    }
}

#[test]
fn custom_relations_over_closures() {
    #[derive(Debug, Clone, PartialEq)]
    struct Shelf {
        id: EntityId,
        curator_id: Option<EntityId>,
        curator: Option<User>,
        books: Option<Vec<Genre>>,
    }

    impl bookshelf::Entity for Shelf {
        fn id(&self) -> EntityId {
            self.id
        }
    }

    let curators = HasOneRelation::<Shelf, User>::builder()
        .foreign_key(|s| s.curator_id)
        .setter(|s, u| s.curator = Some(u))
        .build()
        .unwrap();
    let source = |ids: &[EntityId]| -> Result<HashMap<EntityId, User>, HydrationError> {
        Ok(ids.iter().map(|id| (*id, User::new(*id, "curator"))).collect())
    };
    let mut shelves = vec![
        Shelf { id: 1, curator_id: Some(4), curator: None, books: None },
        Shelf { id: 2, curator_id: None, curator: None, books: None },
    ];
    curators.load(&mut shelves, &source).unwrap();
    assert_eq!(shelves[0].curator, Some(User::new(4, "curator")));
    assert_eq!(shelves[1].curator, None);

    let relation = ManyToManyRelation::<Shelf, Genre>::builder()
        .join_table("shelf_genre")
        .parent_column("shelf_id")
        .related_column("genre_id")
        .related_table("genre")
        .parent_table("shelf")
        .setter(|s, g| s.books = Some(g))
        .build()
        .unwrap();
    let runner = MemoryRunner::new();
    runner.push_result(vec![MemoryRow::new()
        .with("parent_id", 2i64)
        .with("id", 9i64)
        .with("name", "Atlas")]);
    relation.load(&mut shelves, &runner, FetchStrategy::Select).unwrap();
    assert_eq!(shelves[0].books, Some(vec![]));
    assert_eq!(shelves[1].books, Some(vec![Genre::new(9, "Atlas")]));
}
