//! API routes for the Q&A server

pub mod ask;
pub mod documents;
pub mod ingest;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Document management
        .route("/documents", get(documents::list_documents))
        .route("/documents/:id", delete(documents::delete_document))
        // Ingestion
        .route("/ingest", post(ingest::ingest_document))
        // Question answering
        .route("/ask", post(ask::ask_question))
        .route("/history", get(ask::get_history))
        // Info
        .route("/info", get(info))
}

/// API info endpoint
async fn info(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> axum::Json<serde_json::Value> {
    let config = state.config();
    axum::Json(serde_json::json!({
        "name": "askdoc",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Document Q&A with retrieval-augmented answers",
        "models": {
            "embedding": config.embeddings.model,
            "generation": config.llm.generate_model,
        },
        "retrieval": {
            "top_k": config.retrieval.top_k,
            "score_threshold": config.retrieval.score_threshold,
            "shared_corpus": config.retrieval.shared_corpus,
        },
        "endpoints": {
            "POST /api/ingest": "Ingest a plain-text document",
            "GET /api/documents": "List the caller's documents",
            "DELETE /api/documents/:id": "Delete a document and its chunks",
            "POST /api/ask": "Answer a question from the caller's corpus",
            "GET /api/history": "Read the caller's question history"
        }
    }))
}
