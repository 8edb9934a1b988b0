use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::{error::AppResult, routes::AppState, services::books};

#[derive(Debug, Deserialize)]
pub struct SummaryRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub summary: String,
}

/// Handler for free-form text generation
pub async fn generate(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SummaryRequest>,
) -> AppResult<Json<SummaryResponse>> {
    let summary = books::generate_summary(state.generator.as_ref(), &request.content).await?;
    Ok(Json(SummaryResponse { summary }))
}
