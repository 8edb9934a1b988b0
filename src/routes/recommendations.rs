use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    middleware::RequestId,
    routes::AppState,
    services::{recommendation::EngineReport, Recommendation},
};

#[derive(Debug, Deserialize)]
pub struct RecommendationRequest {
    pub genre: String,
    pub min_rating: f64,
}

/// Body returned for a recommendation query
#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    #[serde(flatten)]
    pub recommendation: Recommendation,
    /// Present for the two empty outcomes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

impl From<Recommendation> for RecommendationResponse {
    fn from(recommendation: Recommendation) -> Self {
        let message = match recommendation {
            Recommendation::Found { .. } => None,
            Recommendation::NoGenreMatch => Some(
                "No books found for the specified genre. Please try a different genre.",
            ),
            Recommendation::NoRatingMatch => Some(
                "No recommendations found. Consider lowering the minimum rating or trying another genre.",
            ),
        };
        Self {
            recommendation,
            message,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub records: usize,
    pub dropped: usize,
    pub loaded_at: DateTime<Utc>,
}

/// Handler for recommendation queries
pub async fn recommend(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<RecommendationRequest>,
) -> AppResult<Json<RecommendationResponse>> {
    if request.genre.trim().is_empty() {
        return Err(AppError::InvalidInput("genre cannot be empty".to_string()));
    }
    if !request.min_rating.is_finite() {
        return Err(AppError::InvalidInput(
            "min_rating must be a finite number".to_string(),
        ));
    }

    tracing::info!(
        request_id = %request_id,
        genre = %request.genre,
        min_rating = request.min_rating,
        "Processing recommendation request"
    );

    let recommendation = state
        .engine
        .recommend_books(&request.genre, request.min_rating)
        .await?;

    Ok(Json(recommendation.into()))
}

/// Handler forcing a reload of the ratings table
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
) -> AppResult<Json<RefreshResponse>> {
    tracing::info!(request_id = %request_id, "Refreshing ratings table");

    let snapshot = state.engine.refresh().await?;

    Ok(Json(RefreshResponse {
        records: snapshot.records.len(),
        dropped: snapshot.dropped,
        loaded_at: snapshot.loaded_at,
    }))
}

/// Handler describing the loaded ratings table and model
pub async fn status(State(state): State<Arc<AppState>>) -> Json<EngineReport> {
    Json(state.engine.report().await)
}
