use axum::{extract::State, http::StatusCode, Json};
use embeddings::EmbeddingModel;
use semchunk_core::{Chunk, ChunkingConfig, EmbeddingConfig, Frame};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

pub struct AppState {
    pub model: Arc<EmbeddingModel>,
    pub model_id: String,
    pub embedding_config: EmbeddingConfig,
}

#[derive(Deserialize)]
pub struct EmbedDocument {
    pub id: Option<String>,
    #[serde(default)]
    pub text: String,
    /// Transcript input; takes precedence over `text` when non-empty.
    #[serde(default)]
    pub frames: Vec<Frame>,
    pub chunking_config: Option<ChunkingConfig>,
}

#[derive(Deserialize)]
pub struct EmbedRequest {
    #[serde(default)]
    pub documents: Vec<EmbedDocument>,
}

#[derive(Serialize)]
pub struct ChunkResponse {
    pub text: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub start_time: String,
    pub embedding: Vec<f32>,
    pub num_sentences: usize,
    pub token_count: usize,
    pub chunk_index: usize,
}

impl From<Chunk> for ChunkResponse {
    fn from(chunk: Chunk) -> Self {
        Self {
            text: chunk.text,
            start_time: chunk.start_time,
            embedding: chunk.embedding.unwrap_or_default(),
            num_sentences: chunk.num_sentences,
            token_count: chunk.token_count,
            chunk_index: chunk.chunk_index,
        }
    }
}

#[derive(Serialize)]
pub struct DocumentResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub chunks: Vec<ChunkResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct EmbedResponse {
    pub documents: Vec<DocumentResponse>,
}

/// POST /embed. Documents are processed sequentially and independently: a
/// failing document carries its error in the response while the rest of the
/// batch proceeds.
pub async fn embed_documents(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EmbedRequest>,
) -> Result<Json<EmbedResponse>, (StatusCode, String)> {
    if req.documents.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "at least one document is required".to_string(),
        ));
    }

    info!("embedding {} documents", req.documents.len());

    let documents = req
        .documents
        .into_iter()
        .map(|doc| process_document(&state, doc))
        .collect();

    Ok(Json(EmbedResponse { documents }))
}

fn process_document(state: &AppState, doc: EmbedDocument) -> DocumentResponse {
    let config = doc.chunking_config.unwrap_or_default();

    let result = if !doc.frames.is_empty() {
        chunking::process_frames(
            state.model.as_ref(),
            &doc.frames,
            &config,
            &state.embedding_config,
        )
    } else if !doc.text.is_empty() {
        chunking::process_document(
            state.model.as_ref(),
            &doc.text,
            &config,
            &state.embedding_config,
        )
    } else {
        Err(anyhow::anyhow!("text field is required"))
    };

    match result {
        Ok(chunks) => DocumentResponse {
            id: doc.id,
            chunks: chunks.into_iter().map(ChunkResponse::from).collect(),
            error: None,
        },
        Err(e) => {
            warn!("document {:?} failed: {e:#}", doc.id);
            DocumentResponse {
                id: doc.id,
                chunks: Vec::new(),
                error: Some(format!("{e:#}")),
            }
        }
    }
}
