//! The QuoteMaster RAG pipeline
//!
//! This crate wires retrieval, context assembly, prompt construction,
//! and the local LLM into one chat turn:
//! - Retriever: vector + knowledge-graph lookup for a user query
//! - ContextAssembler: merges retrieved material under a token budget
//! - PromptBuilder: system instructions + history + context + query
//! - OllamaClient: embeddings and completions against local Ollama
//! - ChatOrchestrator: the per-turn state machine tying it together

pub mod assembler;
pub mod config;
pub mod error;
pub mod llm;
pub mod ollama;
pub mod orchestrator;
pub mod prompt;
pub mod retriever;
pub mod session;

pub use assembler::ContextAssembler;
pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use llm::{CompletionClient, Embedder};
pub use ollama::OllamaClient;
pub use orchestrator::{ChatOrchestrator, TurnOutcome, TurnState};
pub use prompt::PromptBuilder;
pub use retriever::Retriever;
pub use session::{MemorySessionStore, SessionStore};
