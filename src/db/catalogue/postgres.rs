use sqlx::PgPool;

use super::CatalogueStore;
use crate::{
    error::AppResult,
    models::{Book, BookPatch, NewBook, NewReview, Review},
};

const BOOK_COLUMNS: &str = "id, title, author, genre, year_published, summary";
const REVIEW_COLUMNS: &str = "id, book_id, user_id, review_text, rating";

/// Catalogue backed by the `books` and `reviews` tables
#[derive(Clone)]
pub struct PgCatalogue {
    pool: PgPool,
}

impl PgCatalogue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CatalogueStore for PgCatalogue {
    async fn create_book(&self, book: NewBook) -> AppResult<Book> {
        let created = sqlx::query_as::<_, Book>(&format!(
            r#"
            INSERT INTO books (title, author, genre, year_published, summary)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {BOOK_COLUMNS}
            "#
        ))
        .bind(book.title)
        .bind(book.author)
        .bind(book.genre)
        .bind(book.year_published)
        .bind(book.summary)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn list_books(&self) -> AppResult<Vec<Book>> {
        let books =
            sqlx::query_as::<_, Book>(&format!("SELECT {BOOK_COLUMNS} FROM books ORDER BY id"))
                .fetch_all(&self.pool)
                .await?;

        Ok(books)
    }

    async fn get_book(&self, id: i64) -> AppResult<Option<Book>> {
        let book =
            sqlx::query_as::<_, Book>(&format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(book)
    }

    async fn update_book(&self, id: i64, patch: BookPatch) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(&format!(
            r#"
            UPDATE books
            SET title = COALESCE($2, title),
                author = COALESCE($3, author),
                genre = COALESCE($4, genre),
                year_published = COALESCE($5, year_published),
                summary = COALESCE($6, summary)
            WHERE id = $1
            RETURNING {BOOK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(patch.title)
        .bind(patch.author)
        .bind(patch.genre)
        .bind(patch.year_published)
        .bind(patch.summary)
        .fetch_optional(&self.pool)
        .await?;

        Ok(book)
    }

    async fn delete_book(&self, id: i64) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM reviews WHERE book_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        Ok(deleted > 0)
    }

    async fn create_review(&self, review: NewReview) -> AppResult<Review> {
        let created = sqlx::query_as::<_, Review>(&format!(
            r#"
            INSERT INTO reviews (book_id, user_id, review_text, rating)
            VALUES ($1, $2, $3, $4)
            RETURNING {REVIEW_COLUMNS}
            "#
        ))
        .bind(review.book_id)
        .bind(review.user_id)
        .bind(review.review_text)
        .bind(review.rating)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn reviews_for_book(&self, book_id: i64) -> AppResult<Vec<Review>> {
        let reviews = sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE book_id = $1 ORDER BY id"
        ))
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(reviews)
    }
}
