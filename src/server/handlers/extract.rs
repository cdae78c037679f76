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
pub struct ExtractRequest {
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct FormatRequest {
    #[serde(default)]
    pub fields: Option<Vec<String>>,
}

pub async fn extract(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ExtractRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = workflow::extract_last(&state, &payload.description).await?;
    Ok(Json(json!({"success": true, "result": outcome})))
}

pub async fn format(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<FormatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = workflow::format_last(&state, payload.fields).await?;
    Ok(Json(json!({"success": true, "result": outcome})))
}
