//! Similarity search over stored chunk embeddings

pub mod search;

pub use search::{SearchResult, SimilarityIndex};
