//! External capability seams
//!
//! The embedding function and the completion model are external
//! services. These traits are the only thing the pipeline sees, so
//! tests can substitute deterministic implementations.

use crate::Result;
use async_trait::async_trait;

/// Turns text into a fixed-length vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }
}

/// Sends a fully-built prompt to the model and returns its completion.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}
