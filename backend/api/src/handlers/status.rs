use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use super::AppState;

#[derive(Serialize)]
pub struct ServiceStatus {
    pub status: String,
    pub version: String,
    pub model: String,
    pub embedding_dimension: usize,
    pub max_batch_tokens: usize,
}

/// GET /status. The model loads before the server binds, so a reachable
/// server is a ready server.
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<ServiceStatus> {
    Json(ServiceStatus {
        status: "ready".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        model: state.model_id.clone(),
        embedding_dimension: state.model.dimension(),
        max_batch_tokens: state.embedding_config.max_batch_tokens,
    })
}
