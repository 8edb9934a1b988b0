use crate::{
    db::CatalogueStore,
    error::{AppError, AppResult},
    models::{average_rating, Book, BookPatch, BookSummary, NewBook, NewReview, Review},
    services::providers::SummaryProvider,
};

fn book_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Book {} not found", id))
}

/// Stores a new book, generating its summary first when none was supplied.
///
/// A failing summary provider aborts the creation; nothing is stored.
pub async fn create_book(
    store: &dyn CatalogueStore,
    summaries: &dyn SummaryProvider,
    mut book: NewBook,
) -> AppResult<Book> {
    book.validate()?;

    if book.needs_summary() {
        let prompt = book.summary_prompt();
        let summary = summaries.generate(&prompt).await.map_err(|e| {
            tracing::error!(error = %e, title = %book.title, "Summary generation failed");
            e
        })?;
        book.summary = Some(summary);
    }

    let created = store.create_book(book).await?;
    tracing::info!(book_id = created.id, title = %created.title, "Book created");

    Ok(created)
}

pub async fn list_books(store: &dyn CatalogueStore) -> AppResult<Vec<Book>> {
    store.list_books().await
}

pub async fn get_book(store: &dyn CatalogueStore, id: i64) -> AppResult<Book> {
    store.get_book(id).await?.ok_or_else(|| book_not_found(id))
}

pub async fn update_book(store: &dyn CatalogueStore, id: i64, patch: BookPatch) -> AppResult<Book> {
    let updated = store
        .update_book(id, patch)
        .await?
        .ok_or_else(|| book_not_found(id))?;

    tracing::info!(book_id = id, "Book updated");
    Ok(updated)
}

pub async fn delete_book(store: &dyn CatalogueStore, id: i64) -> AppResult<()> {
    if !store.delete_book(id).await? {
        return Err(book_not_found(id));
    }

    tracing::info!(book_id = id, "Book deleted");
    Ok(())
}

/// Adds a review to an existing book
pub async fn add_review(store: &dyn CatalogueStore, review: NewReview) -> AppResult<Review> {
    review.validate()?;
    get_book(store, review.book_id).await?;

    let created = store.create_review(review).await?;
    tracing::info!(book_id = created.book_id, review_id = created.id, "Review added");

    Ok(created)
}

pub async fn reviews_for_book(store: &dyn CatalogueStore, book_id: i64) -> AppResult<Vec<Review>> {
    get_book(store, book_id).await?;
    store.reviews_for_book(book_id).await
}

/// The book's stored summary together with its mean review rating
pub async fn book_summary(store: &dyn CatalogueStore, book_id: i64) -> AppResult<BookSummary> {
    let book = get_book(store, book_id).await?;
    let reviews = store.reviews_for_book(book_id).await?;

    Ok(BookSummary {
        book_id: book.id,
        title: book.title,
        summary: book.summary,
        average_review_rating: average_rating(&reviews),
        review_count: reviews.len(),
    })
}

/// Free-form text generation on behalf of the client
pub async fn generate_summary(summaries: &dyn SummaryProvider, content: &str) -> AppResult<String> {
    if content.trim().is_empty() {
        return Err(AppError::InvalidInput("content cannot be empty".to_string()));
    }
    summaries.generate(content).await
}
