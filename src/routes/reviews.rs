use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{BookSummary, Review, ReviewRequest},
    routes::AppState,
    services::books,
};

/// Handler adding a review to the book in the path
pub async fn create(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<i64>,
    Json(request): Json<ReviewRequest>,
) -> AppResult<(StatusCode, Json<Review>)> {
    let review = books::add_review(state.catalogue.as_ref(), request.for_book(book_id)).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<i64>,
) -> AppResult<Json<Vec<Review>>> {
    let reviews = books::reviews_for_book(state.catalogue.as_ref(), book_id).await?;
    Ok(Json(reviews))
}

/// Handler returning the book's summary and its aggregated review rating
pub async fn book_summary(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<i64>,
) -> AppResult<Json<BookSummary>> {
    let summary = books::book_summary(state.catalogue.as_ref(), book_id).await?;
    Ok(Json(summary))
}
