//! In-process vector index over document chunks
//!
//! A flat cosine-similarity index. `build` constructs a fresh
//! immutable index and swaps it in atomically, so concurrent readers
//! always see either the previous or the new index, never a partial
//! one.

use crate::{Result, StoreError};
use quotemaster_core::{DocumentChunk, ScoredChunk};
use std::cmp::Ordering;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// An immutable, fully-built snapshot of the index.
#[derive(Debug)]
struct VectorIndex {
    dimension: usize,
    chunks: Vec<DocumentChunk>,
    /// Precomputed L2 norms, parallel to `chunks`
    norms: Vec<f32>,
}

impl VectorIndex {
    fn build(chunks: Vec<DocumentChunk>) -> Result<Self> {
        let dimension = chunks.first().map(|c| c.embedding.len()).unwrap_or(0);

        for chunk in &chunks {
            if chunk.embedding.len() != dimension {
                return Err(StoreError::DimensionMismatch {
                    expected: dimension,
                    actual: chunk.embedding.len(),
                });
            }
        }

        let norms = chunks.iter().map(|c| l2_norm(&c.embedding)).collect();

        Ok(Self {
            dimension,
            chunks,
            norms,
        })
    }
}

/// Vector store over document chunks.
///
/// Owns the index behind a swap pointer; callers share it via `Arc`
/// and pass it into the retriever as an explicit dependency.
#[derive(Debug, Default)]
pub struct EmbeddingStore {
    index: RwLock<Option<Arc<VectorIndex>>>,
}

impl EmbeddingStore {
    /// Create an empty store; `search` fails until `build` is called.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index from chunks, replacing any previous index
    /// atomically. All embeddings must share one dimensionality.
    pub fn build(&self, chunks: Vec<DocumentChunk>) -> Result<()> {
        let count = chunks.len();
        let index = Arc::new(VectorIndex::build(chunks)?);

        info!(
            "Built vector index: {} chunks, dimension {}",
            count, index.dimension
        );

        let mut slot = self.index.write().expect("index lock poisoned");
        *slot = Some(index);
        Ok(())
    }

    /// Nearest-neighbor search by cosine similarity.
    ///
    /// Returns at most `k` chunks ordered by descending similarity;
    /// ties break by source recency when both chunks carry an indexing
    /// timestamp, otherwise by insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        let index = self
            .snapshot()
            .ok_or(StoreError::IndexNotBuilt)?;

        if index.chunks.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        if query.len() != index.dimension {
            return Err(StoreError::DimensionMismatch {
                expected: index.dimension,
                actual: query.len(),
            });
        }

        let query_norm = l2_norm(query);
        let mut order: Vec<(usize, f32)> = index
            .chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| {
                let score = cosine(query, query_norm, &chunk.embedding, index.norms[i]);
                (i, score)
            })
            .collect();

        order.sort_by(|a, b| match b.1.total_cmp(&a.1) {
            Ordering::Equal => {
                let ta = index.chunks[a.0].source_ref.indexed_at;
                let tb = index.chunks[b.0].source_ref.indexed_at;
                match (ta, tb) {
                    // Newer source wins the tie
                    (Some(ta), Some(tb)) => tb.cmp(&ta).then(a.0.cmp(&b.0)),
                    _ => a.0.cmp(&b.0),
                }
            }
            other => other,
        });

        let results: Vec<ScoredChunk> = order
            .into_iter()
            .take(k)
            .map(|(i, score)| ScoredChunk {
                chunk: index.chunks[i].clone(),
                score,
            })
            .collect();

        debug!("Vector search returned {} results", results.len());
        Ok(results)
    }

    /// Whether a `build` has completed.
    pub fn is_built(&self) -> bool {
        self.snapshot().is_some()
    }

    /// Dimensionality of the current index, if built.
    pub fn dimension(&self) -> Option<usize> {
        self.snapshot().map(|index| index.dimension)
    }

    /// Number of indexed chunks.
    pub fn chunk_count(&self) -> usize {
        self.snapshot().map(|index| index.chunks.len()).unwrap_or(0)
    }

    fn snapshot(&self) -> Option<Arc<VectorIndex>> {
        self.index.read().expect("index lock poisoned").clone()
    }
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn cosine(a: &[f32], a_norm: f32, b: &[f32], b_norm: f32) -> f32 {
    if a_norm == 0.0 || b_norm == 0.0 {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    dot / (a_norm * b_norm)
}
