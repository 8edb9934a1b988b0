use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::{json, Map, Value};

use crate::{
    error::AppResult,
    middleware::RequestId,
    models::{Book, BookPatch, NewBook},
    routes::AppState,
    services::books,
};

/// Handler for creating a book
pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(fields): Json<Map<String, Value>>,
) -> AppResult<(StatusCode, Json<Book>)> {
    let request = NewBook::from_json(fields)?;
    tracing::info!(
        request_id = %request_id,
        title = %request.title,
        generate_summary = request.needs_summary(),
        "Processing book creation"
    );

    let book = books::create_book(
        state.catalogue.as_ref(),
        state.summaries.as_ref(),
        request,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(book)))
}

/// Handler listing every book
pub async fn list(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<Book>>> {
    let books = books::list_books(state.catalogue.as_ref()).await?;
    Ok(Json(books))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> AppResult<Json<Book>> {
    let book = books::get_book(state.catalogue.as_ref(), id).await?;
    Ok(Json(book))
}

/// Handler for partial updates; field names are matched case-insensitively
pub async fn update(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<i64>,
    Json(fields): Json<Map<String, Value>>,
) -> AppResult<Json<Book>> {
    let patch = BookPatch::from_json(fields)?;

    tracing::info!(request_id = %request_id, book_id = id, "Processing book update");

    let book = books::update_book(state.catalogue.as_ref(), id, patch).await?;
    Ok(Json(book))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    tracing::info!(request_id = %request_id, book_id = id, "Processing book deletion");

    books::delete_book(state.catalogue.as_ref(), id).await?;
    Ok(Json(json!({
        "message": format!("Book with ID {} deleted successfully", id)
    })))
}
