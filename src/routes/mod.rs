use std::sync::Arc;

use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{make_span_with_request_id, request_id_middleware};

pub mod books;
pub mod recommendations;
pub mod reviews;
pub mod state;
pub mod summaries;

pub use state::AppState;

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Books
        .route("/books", get(books::list).post(books::create))
        .route(
            "/books/:id",
            get(books::get)
                .put(books::update)
                .patch(books::update)
                .delete(books::delete),
        )
        // Reviews
        .route(
            "/books/:id/reviews",
            get(reviews::list).post(reviews::create),
        )
        .route("/books/:id/summary", get(reviews::book_summary))
        // Text generation
        .route("/generate-summary", post(summaries::generate))
        // Recommendations
        .route("/recommendations", post(recommendations::recommend))
        .route("/recommendations/refresh", post(recommendations::refresh))
        .route("/recommendations/status", get(recommendations::status))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
