//! Response types for the HTTP API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Answer to a question, with the distinct source labels that grounded it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    /// Distinct source labels in rank order; empty when nothing was relevant
    pub sources: Vec<String>,
}

/// Result of a successful ingest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    pub document_id: Uuid,
    pub source_label: String,
    pub chunks_created: usize,
}

/// One document as listed for an owner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: Uuid,
    pub filename: String,
    pub ingested_at: DateTime<Utc>,
}

/// Result of a successful delete
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub document_id: Uuid,
    pub chunks_removed: usize,
}
