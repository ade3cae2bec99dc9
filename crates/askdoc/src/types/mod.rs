//! Core data types

pub mod document;
pub mod query;
pub mod response;

pub use document::{Chunk, Document, HistoryRecord, ScopedChunk};
pub use query::{AskRequest, HistoryQuery, IngestRequest, OwnerQuery};
pub use response::{AskResponse, DeleteResponse, DocumentSummary, IngestResponse};
