//! Engine error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Prompt too large: {tokens} tokens exceeds window of {limit}")]
    PromptTooLarge { tokens: usize, limit: usize },

    #[error("LLM call timed out: {0}")]
    LlmTimeout(String),

    #[error("LLM service unavailable: {0}")]
    LlmUnavailable(String),

    #[error("Store error: {0}")]
    Store(#[from] quotemaster_store::StoreError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Processing error: {0}")]
    Processing(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
