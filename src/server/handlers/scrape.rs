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
pub struct ScrapeRequest {
    pub url: String,
    #[serde(default)]
    pub use_proxy: bool,
}

#[derive(Debug, Deserialize)]
pub struct BulkScrapeRequest {
    pub query: String,
    #[serde(default = "default_bulk_count")]
    pub count: usize,
}

fn default_bulk_count() -> usize {
    5
}

pub async fn scrape(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ScrapeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    match workflow::scrape_page(&state, &payload.url, payload.use_proxy).await? {
        Some(outcome) => Ok(Json(json!({"success": true, "result": outcome}))),
        None => Ok(Json(json!({
            "success": false,
            "message": "failed to retrieve the page; check the URL and try again",
        }))),
    }
}

pub async fn bulk_scrape(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<BulkScrapeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = workflow::bulk_scrape(&state, &payload.query, payload.count).await?;
    Ok(Json(json!({"success": true, "result": outcome})))
}
