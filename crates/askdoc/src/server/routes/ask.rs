//! Question answering and history endpoints

use axum::{
    extract::{Query, State},
    Json,
};

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{
    document::HistoryRecord,
    query::{AskRequest, HistoryQuery},
    response::AskResponse,
};

/// POST /api/ask - Answer a question from the caller's corpus
pub async fn ask_question(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>> {
    tracing::info!(owner_id = %request.owner_id, "Question: \"{}\"", request.question);

    let response = state
        .engine()
        .ask(&request.owner_id, &request.question)
        .await?;

    Ok(Json(response))
}

/// GET /api/history?owner_id=...&limit=...&offset=... - Read question history
pub async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<HistoryRecord>>> {
    let records = state
        .engine()
        .history(&query.owner_id, query.limit, query.offset)?;
    Ok(Json(records))
}
