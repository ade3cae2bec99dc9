//! Text ingestion: fixed-window chunking

pub mod chunker;

pub use chunker::TextChunker;
