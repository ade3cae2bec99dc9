//! askdoc: Document Q&A with retrieval-augmented answers
//!
//! This crate turns ingested plain-text documents into a searchable corpus of
//! overlapping, embedded chunks and answers natural-language questions from
//! it. Retrieval ranks chunks by cosine similarity against the query
//! embedding, filters by a relevance threshold, and hands the surviving
//! chunks as a source-attributed context to an LLM backend (Ollama).

pub mod config;
pub mod engine;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod storage;
pub mod types;

pub use config::RagConfig;
pub use engine::RagEngine;
pub use error::{Error, Result};
pub use types::{
    document::{Chunk, Document, HistoryRecord, ScopedChunk},
    query::{AskRequest, IngestRequest},
    response::{AskResponse, DocumentSummary, IngestResponse},
};
