use crate::{
    error::AppResult,
    models::{Book, BookPatch, NewBook, NewReview, Review},
};

mod memory;
mod postgres;

pub use memory::InMemoryCatalogue;
pub use postgres::PgCatalogue;

/// Persistence for books and their reviews
///
/// Lookups by id return `None` when the row does not exist; turning that into
/// a not-found error is left to the caller.
#[async_trait::async_trait]
pub trait CatalogueStore: Send + Sync {
    /// Stores a book and returns it with its assigned id
    async fn create_book(&self, book: NewBook) -> AppResult<Book>;

    /// All books ordered by id
    async fn list_books(&self) -> AppResult<Vec<Book>>;

    async fn get_book(&self, id: i64) -> AppResult<Option<Book>>;

    /// Applies a partial update, returning the updated book
    async fn update_book(&self, id: i64, patch: BookPatch) -> AppResult<Option<Book>>;

    /// Deletes a book together with its reviews. Returns false if it did not exist.
    async fn delete_book(&self, id: i64) -> AppResult<bool>;

    async fn create_review(&self, review: NewReview) -> AppResult<Review>;

    /// Reviews of one book ordered by id
    async fn reviews_for_book(&self, book_id: i64) -> AppResult<Vec<Review>>;
}
