use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;
use crate::workflow;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = workflow::chat(&state, &payload.message).await?;
    Ok(Json(json!({"success": true, "result": outcome})))
}

pub async fn get_history(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let session = state.session.lock().await;
    Json(json!({
        "history": session.history_json(),
        "scraped_urls": session.recent_urls(20),
    }))
}
