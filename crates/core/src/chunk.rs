//! Document chunks - the indexed units of reference text

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a chunk came from (quote file, service catalog entry, ...)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceRef {
    /// URI or file path of the source document
    pub uri: String,

    /// When the source was indexed, if known; used for recency tie-breaks
    #[serde(default)]
    pub indexed_at: Option<DateTime<Utc>>,
}

impl SourceRef {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            indexed_at: None,
        }
    }

    /// Builder: set the indexing timestamp
    pub fn with_indexed_at(mut self, at: DateTime<Utc>) -> Self {
        self.indexed_at = Some(at);
        self
    }
}

/// An indexed chunk of reference text. Immutable once indexed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Index-assigned identifier (position in the build order)
    pub id: u64,

    /// Source the chunk was extracted from
    pub source_ref: SourceRef,

    /// The chunk text itself
    pub text: String,

    /// Vector embedding; dimensionality must match the index
    #[serde(default)]
    pub embedding: Vec<f32>,
}

impl DocumentChunk {
    /// Create a new chunk with text
    pub fn new(id: u64, text: impl Into<String>) -> Self {
        Self {
            id,
            source_ref: SourceRef::new("unknown"),
            text: text.into(),
            embedding: Vec::new(),
        }
    }

    /// Builder: set the source reference
    pub fn with_source(mut self, source_ref: SourceRef) -> Self {
        self.source_ref = source_ref;
        self
    }

    /// Builder: set the embedding
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }

    /// Check if the chunk carries an embedding
    pub fn has_embedding(&self) -> bool {
        !self.embedding.is_empty()
    }
}

/// A chunk paired with its similarity score for one query
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,
    /// Cosine similarity to the query, higher is more relevant
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_creation() {
        let chunk = DocumentChunk::new(0, "Website development quote")
            .with_source(SourceRef::new("data/quotes/web.txt"))
            .with_embedding(vec![0.1, 0.2, 0.3]);

        assert_eq!(chunk.id, 0);
        assert_eq!(chunk.source_ref.uri, "data/quotes/web.txt");
        assert!(chunk.has_embedding());
    }

    #[test]
    fn test_chunk_without_embedding() {
        let chunk = DocumentChunk::new(1, "text");
        assert!(!chunk.has_embedding());
    }
}
