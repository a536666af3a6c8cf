//! Catalog records: books, their authors and their genres.

mod book;
mod genre;
mod user;

pub use book::Book;
pub use genre::Genre;
pub use user::User;
