use std::collections::BTreeMap;

use tokio::sync::RwLock;

use super::CatalogueStore;
use crate::{
    error::AppResult,
    models::{Book, BookPatch, NewBook, NewReview, Review},
};

/// Catalogue held in process memory, used for tests and local runs without Postgres
#[derive(Default)]
pub struct InMemoryCatalogue {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    books: BTreeMap<i64, Book>,
    reviews: BTreeMap<i64, Review>,
    last_book_id: i64,
    last_review_id: i64,
}

impl InMemoryCatalogue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CatalogueStore for InMemoryCatalogue {
    async fn create_book(&self, book: NewBook) -> AppResult<Book> {
        let mut inner = self.inner.write().await;
        inner.last_book_id += 1;

        let created = Book {
            id: inner.last_book_id,
            title: book.title,
            author: book.author,
            genre: book.genre,
            year_published: book.year_published,
            summary: book.summary,
        };
        inner.books.insert(created.id, created.clone());

        Ok(created)
    }

    async fn list_books(&self) -> AppResult<Vec<Book>> {
        let inner = self.inner.read().await;
        Ok(inner.books.values().cloned().collect())
    }

    async fn get_book(&self, id: i64) -> AppResult<Option<Book>> {
        let inner = self.inner.read().await;
        Ok(inner.books.get(&id).cloned())
    }

    async fn update_book(&self, id: i64, patch: BookPatch) -> AppResult<Option<Book>> {
        let mut inner = self.inner.write().await;
        Ok(inner.books.get_mut(&id).map(|book| {
            patch.apply(book);
            book.clone()
        }))
    }

    async fn delete_book(&self, id: i64) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        inner.reviews.retain(|_, review| review.book_id != id);
        Ok(inner.books.remove(&id).is_some())
    }

    async fn create_review(&self, review: NewReview) -> AppResult<Review> {
        let mut inner = self.inner.write().await;
        inner.last_review_id += 1;

        let created = Review {
            id: inner.last_review_id,
            book_id: review.book_id,
            user_id: review.user_id,
            review_text: review.review_text,
            rating: review.rating,
        };
        inner.reviews.insert(created.id, created.clone());

        Ok(created)
    }

    async fn reviews_for_book(&self, book_id: i64) -> AppResult<Vec<Review>> {
        let inner = self.inner.read().await;
        Ok(inner
            .reviews
            .values()
            .filter(|review| review.book_id == book_id)
            .cloned()
            .collect())
    }
}
