//! Request types for the HTTP API

use serde::{Deserialize, Serialize};

/// Ingest request: plain text plus a source label
///
/// Text extraction from raw files (PDF, Word, CSV, ...) happens outside the
/// core; this endpoint consumes the extracted text only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestRequest {
    /// Owner identity
    pub owner_id: String,
    /// Display name used as the source label in answers (e.g. the filename)
    pub source_label: String,
    /// Extracted plain text
    pub text: String,
}

/// Ask request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    /// Owner identity
    pub owner_id: String,
    /// The question to answer
    pub question: String,
}

/// Query parameters carrying only an owner identity
#[derive(Debug, Clone, Deserialize)]
pub struct OwnerQuery {
    pub owner_id: String,
}

/// Query parameters for paginated history reads
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryQuery {
    pub owner_id: String,
    /// Maximum number of records to return (default: 50)
    #[serde(default = "default_history_limit")]
    pub limit: usize,
    /// Number of records to skip from the start of the log
    #[serde(default)]
    pub offset: usize,
}

fn default_history_limit() -> usize {
    50
}
