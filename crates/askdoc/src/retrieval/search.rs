//! Flat inner-product index over normalized embeddings
//!
//! The index is rebuilt from the stored chunks on every query. Vectors are
//! L2-normalized, so the inner product equals cosine similarity. Corpora
//! here are small enough that a brute-force scan beats maintaining an
//! approximate structure.

use crate::error::{Error, Result};
use crate::types::document::ScopedChunk;

/// One ranked hit: a borrowed chunk and its cosine similarity score
#[derive(Debug)]
pub struct SearchResult<'a> {
    pub chunk: &'a ScopedChunk,
    pub score: f32,
}

/// Brute-force cosine similarity index over a chunk scope
pub struct SimilarityIndex<'a> {
    chunks: &'a [ScopedChunk],
    /// Normalized copies of the chunk embeddings, in chunk order
    normalized: Vec<Vec<f32>>,
    dimensions: usize,
}

impl<'a> SimilarityIndex<'a> {
    /// Build an index over `chunks`
    ///
    /// Fails with `StoreInconsistency` if the chunks do not all share one
    /// dimensionality.
    pub fn build(chunks: &'a [ScopedChunk]) -> Result<Self> {
        let dimensions = chunks.first().map(|c| c.embedding.len()).unwrap_or(0);

        let mut normalized = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            if chunk.embedding.len() != dimensions {
                return Err(Error::StoreInconsistency(format!(
                    "Chunk {}:{} has {} dimensions, expected {}",
                    chunk.document_id,
                    chunk.chunk_index,
                    chunk.embedding.len(),
                    dimensions
                )));
            }
            normalized.push(l2_normalize(&chunk.embedding));
        }

        Ok(Self {
            chunks,
            normalized,
            dimensions,
        })
    }

    /// Rank chunks by cosine similarity to `query`
    ///
    /// Keeps only hits scoring strictly above `threshold`, sorted by score
    /// descending, capped at `top_k`. Ties keep insertion order (the sort
    /// is stable). An empty index returns no hits.
    pub fn search(
        &self,
        query: &[f32],
        top_k: usize,
        threshold: f32,
    ) -> Result<Vec<SearchResult<'a>>> {
        if self.chunks.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != self.dimensions {
            return Err(Error::StoreInconsistency(format!(
                "Query has {} dimensions, index has {}",
                query.len(),
                self.dimensions
            )));
        }

        let query = l2_normalize(query);

        let mut results: Vec<SearchResult<'a>> = self
            .chunks
            .iter()
            .zip(self.normalized.iter())
            .map(|(chunk, vector)| SearchResult {
                chunk,
                score: dot(&query, vector),
            })
            .filter(|r| r.score > threshold)
            .collect();

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(top_k);

        Ok(results)
    }
}

/// L2-normalize a vector; zero vectors are returned unchanged so their
/// inner product with anything is 0
fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
