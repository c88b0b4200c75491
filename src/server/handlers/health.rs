use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let users = state.users.count().await.ok();
    let index_chunks = state.rag.chunk_count().await.ok();
    Json(json!({
        "status": "ok",
        "users": users,
        "index_chunks": index_chunks
    }))
}
