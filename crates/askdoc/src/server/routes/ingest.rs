//! Ingestion endpoint

use axum::{extract::State, Json};

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{query::IngestRequest, response::IngestResponse};

/// POST /api/ingest - Ingest a plain-text document
pub async fn ingest_document(
    State(state): State<AppState>,
    Json(request): Json<IngestRequest>,
) -> Result<Json<IngestResponse>> {
    tracing::info!(
        owner_id = %request.owner_id,
        "Ingesting '{}' ({} bytes)",
        request.source_label,
        request.text.len()
    );

    let response = state
        .engine()
        .ingest(&request.owner_id, &request.source_label, &request.text)
        .await?;

    Ok(Json(response))
}
