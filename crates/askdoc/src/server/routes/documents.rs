//! Document management endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{
    query::OwnerQuery,
    response::{DeleteResponse, DocumentSummary},
};

/// GET /api/documents?owner_id=... - List the caller's documents
pub async fn list_documents(
    State(state): State<AppState>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<Vec<DocumentSummary>>> {
    let documents = state.engine().documents(&query.owner_id)?;
    Ok(Json(documents))
}

/// DELETE /api/documents/:id?owner_id=... - Delete a document
pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<DeleteResponse>> {
    let response = state.engine().delete(&query.owner_id, id)?;
    Ok(Json(response))
}
