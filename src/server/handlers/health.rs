use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

pub async fn health(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
    }))
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let reachable = state.llm.health().await;
    let session = state.session.lock().await;
    Json(json!({
        "backends": state.llm.backends(),
        "reachable": reachable,
        "scraped_urls": session.scraped_urls.len(),
        "chat_turns": session.chat_history.len(),
        "has_content": session.last_content.is_some(),
        "has_extraction": session.last_extraction.is_some(),
    }))
}
