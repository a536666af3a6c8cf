//! # Bookshelf
//!
//! Book catalog data access for PostgreSQL on the `may` runtime, built around a
//! batched relation-hydration engine.
//!
//! Lists of books are fetched with plain statements and then hydrated in bulk:
//! authors through a has-one relation ([`HasOneRelation`]) and genres through a
//! many-to-many join table ([`ManyToManyRelation`]), without one query per book.

pub mod chunk;
pub mod config;
pub mod connection;
pub mod dao;
pub mod domain;
pub mod entity;
pub mod error;
pub mod executor;
#[cfg(any(feature = "metrics", feature = "tracing"))]
pub mod metrics;
pub mod relation;
pub mod row;
pub mod service;
mod sql;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
mod value_conversion;

pub use chunk::{chunk, DEFAULT_CHUNK_SIZE};
pub use config::{DatabaseConfig, HydrationConfig, Settings};
pub use connection::{connect, connect_with, ConnectionError};
pub use dao::{BookDao, GenreDao, UserDao};
pub use domain::{Book, Genre, User};
pub use entity::{Entity, EntityId};
pub use error::{ConfigurationError, HydrationError, MappingError};
pub use executor::{MayPostgresRunner, SqlRunner, StorageError};
pub use relation::{
    FetchStrategy, HasOneRelation, JoinRow, ManyToManyRelation, RelatedSource,
};
pub use row::{FromRow, MemoryRow, RawRow};
pub use service::BookService;
