use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::auth::CurrentUser;
use crate::core::errors::ApiError;
use crate::server::extract::ApiJson;
use crate::rag::RagError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

fn processing_error(err: RagError) -> ApiError {
    tracing::error!("RAG pipeline failed: {}", err);
    ApiError::Internal("Error processing query".to_string())
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ApiJson(payload): ApiJson<QueryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::debug!("Chat query from {}", user.username);
    let answer = state
        .rag
        .answer(&payload.query)
        .await
        .map_err(processing_error)?;
    Ok(Json(json!({ "answer": answer })))
}

pub async fn query(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<QueryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let answer = state
        .rag
        .answer(&payload.query)
        .await
        .map_err(processing_error)?;
    Ok(Json(json!({ "response": answer })))
}
