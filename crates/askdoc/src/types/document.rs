//! Document, chunk, and history record types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A document that has been ingested
///
/// Identity is immutable once created; the corpus store owns the lifetime of
/// a document and all of its chunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document ID
    pub id: Uuid,
    /// Owner identity (opaque to the core; assigned by the surrounding application)
    pub owner_id: String,
    /// Display name, used as the source label in answers
    pub filename: String,
    /// Ingestion timestamp
    pub ingested_at: chrono::DateTime<chrono::Utc>,
}

impl Document {
    /// Create a new document
    pub fn new(owner_id: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            filename: filename.into(),
            ingested_at: chrono::Utc::now(),
        }
    }
}

/// A chunk of text from a document
///
/// Every chunk in a corpus carries an embedding of the same dimensionality,
/// fixed by the embedding model for the lifetime of the corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Parent document ID
    pub document_id: Uuid,
    /// Sequence index within the document
    pub chunk_index: u32,
    /// Text content
    pub content: String,
    /// Embedding vector
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub embedding: Vec<f32>,
}

impl Chunk {
    /// Create a new chunk
    pub fn new(document_id: Uuid, chunk_index: u32, content: String, embedding: Vec<f32>) -> Self {
        Self {
            document_id,
            chunk_index,
            content,
            embedding,
        }
    }
}

/// A chunk eligible for ranking, joined with its parent document's display
/// name so answers can attribute their sources
#[derive(Debug, Clone)]
pub struct ScopedChunk {
    /// Parent document ID
    pub document_id: Uuid,
    /// Sequence index within the document
    pub chunk_index: u32,
    /// Text content
    pub content: String,
    /// Embedding vector
    pub embedding: Vec<f32>,
    /// Parent document's display name
    pub source_label: String,
}

/// One question/answer interaction, appended to the owner's history log
///
/// History is append-only; no mutation or deletion is defined.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Owner identity
    pub owner_id: String,
    /// The question as asked
    pub question: String,
    /// The answer returned (may be the fixed no-information or a degraded error answer)
    pub answer: String,
    /// Distinct source labels that grounded the answer, in relevance order
    pub sources: Vec<String>,
    /// When the question was asked
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl HistoryRecord {
    /// Create a new history record stamped with the current time
    pub fn new(
        owner_id: impl Into<String>,
        question: impl Into<String>,
        answer: impl Into<String>,
        sources: Vec<String>,
    ) -> Self {
        Self {
            owner_id: owner_id.into(),
            question: question.into(),
            answer: answer.into(),
            sources,
            created_at: chrono::Utc::now(),
        }
    }
}
