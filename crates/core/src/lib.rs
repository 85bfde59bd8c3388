//! Core domain types for the QuoteMaster RAG engine
//!
//! This crate defines the fundamental data structures used throughout
//! the application: document chunks, knowledge-graph entities and
//! relations, chat turns, and the assembled context handed to the
//! language model.

pub mod chunk;
pub mod context;
pub mod entity;
pub mod error;
pub mod quote;
pub mod relation;
pub mod turn;

pub use chunk::{DocumentChunk, ScoredChunk, SourceRef};
pub use context::{count_tokens, AssembledContext, RetrievalResult};
pub use entity::{Entity, EntityType};
pub use error::{CoreError, Result};
pub use quote::QuoteEstimate;
pub use relation::{Relation, RelationType};
pub use turn::{ChatRole, ChatTurn};
