//! Retrieval results and the assembled context block

use crate::{Entity, Relation, ScoredChunk};
use serde::{Deserialize, Serialize};

/// Count tokens in a piece of text.
///
/// A token is a whitespace-delimited word. Every budget in the system
/// (context budget, prompt window) is measured with this one rule so
/// the accounting stays consistent end to end.
pub fn count_tokens(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Everything retrieved for one query. Transient; discarded after
/// context assembly.
#[derive(Debug, Clone, Default)]
pub struct RetrievalResult {
    /// Chunks in relevance order, best first
    pub chunks: Vec<ScoredChunk>,
    /// Entities in relevance order (mention matches first, then
    /// their graph neighborhood)
    pub entities: Vec<Entity>,
    /// Relations whose endpoints are both in `entities`
    pub relations: Vec<Relation>,
}

impl RetrievalResult {
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty() && self.entities.is_empty()
    }
}

/// The bounded context block handed to the prompt builder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssembledContext {
    /// Rendered context text
    pub text: String,
    /// Measured token count of `text`; never exceeds the budget it
    /// was assembled under
    pub token_count: usize,
    /// True if any section was dropped to fit the budget
    pub truncated: bool,
}

impl AssembledContext {
    /// An empty context (nothing retrieved, nothing dropped)
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}
