//! Durable storage for documents, chunks, and question history

pub mod database;

pub use database::CorpusDb;
