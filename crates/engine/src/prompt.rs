//! Prompt builder - deterministic final prompt construction
//!
//! Concatenates system instructions, the trimmed conversation
//! history, the assembled context, and the user message. If the
//! result would exceed the model window, oldest history turns are
//! dropped first; once history is exhausted the context budget is
//! halved and the context reassembled, bounded to a fixed number of
//! rebuild attempts.

use crate::{ContextAssembler, EngineConfig, EngineError, Result};
use quotemaster_core::{count_tokens, AssembledContext, ChatTurn, RetrievalResult};
use tracing::debug;

/// Shrink-and-rebuild attempts after history is exhausted.
const MAX_REBUILD_ATTEMPTS: usize = 3;

/// Builds the final prompt string for the completion model.
pub struct PromptBuilder {
    system: String,
    assembler: ContextAssembler,
    max_prompt_tokens: usize,
    history_limit: usize,
    context_budget: usize,
}

impl PromptBuilder {
    pub fn new(system: impl Into<String>, config: &EngineConfig) -> Self {
        Self {
            system: system.into(),
            assembler: ContextAssembler::new(),
            max_prompt_tokens: config.max_prompt_tokens,
            history_limit: config.history_limit,
            context_budget: config.context_budget_tokens,
        }
    }

    /// Build the prompt, returning it together with the context block
    /// that ended up inside it.
    pub fn build(
        &self,
        history: &[ChatTurn],
        retrieval: &RetrievalResult,
        user_message: &str,
    ) -> Result<(String, AssembledContext)> {
        let start = history.len().saturating_sub(self.history_limit);
        let mut turns: Vec<&ChatTurn> = history[start..].iter().collect();

        let mut budget = self.context_budget;
        let mut context = self.assembler.assemble(retrieval, budget);
        let mut last_tokens = 0;

        for attempt in 0..=MAX_REBUILD_ATTEMPTS {
            loop {
                let prompt = self.render(&turns, &context, user_message);
                last_tokens = count_tokens(&prompt);
                if last_tokens <= self.max_prompt_tokens {
                    return Ok((prompt, context));
                }
                if turns.is_empty() {
                    break;
                }
                // Oldest turn goes first
                turns.remove(0);
            }

            if attempt < MAX_REBUILD_ATTEMPTS {
                budget /= 2;
                debug!(
                    "Prompt over window ({} tokens), shrinking context budget to {}",
                    last_tokens, budget
                );
                context = self.assembler.assemble(retrieval, budget);
            }
        }

        Err(EngineError::PromptTooLarge {
            tokens: last_tokens,
            limit: self.max_prompt_tokens,
        })
    }

    fn render(&self, turns: &[&ChatTurn], context: &AssembledContext, user_message: &str) -> String {
        let history = if turns.is_empty() {
            "No history".to_string()
        } else {
            turns
                .iter()
                .flat_map(|turn| {
                    [
                        format!("user: {}", flatten(&turn.user_message)),
                        format!("assistant: {}", flatten(&turn.assistant_message)),
                    ]
                })
                .collect::<Vec<_>>()
                .join("\n")
        };

        let context_block = if context.is_empty() {
            "No relevant context found."
        } else {
            context.text.as_str()
        };

        format!(
            "{}\n\nConversation history:\n{}\n\nBusiness context and reference documents:\n{}\n\nUser query: {}",
            self.system, history, context_block, user_message
        )
    }
}

/// Collapse a message onto one line for the history block.
fn flatten(message: &str) -> String {
    message
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use quotemaster_core::{DocumentChunk, ScoredChunk};

    fn words(n: usize) -> String {
        vec!["word"; n].join(" ")
    }

    fn retrieval_with_sections(sizes: &[usize]) -> RetrievalResult {
        RetrievalResult {
            chunks: sizes
                .iter()
                .enumerate()
                .map(|(i, n)| ScoredChunk {
                    // 4 header tokens per rendered section
                    chunk: DocumentChunk::new(i as u64, words(n.saturating_sub(4))),
                    score: 0.9,
                })
                .collect(),
            ..Default::default()
        }
    }

    fn config(max_prompt_tokens: usize, context_budget: usize) -> EngineConfig {
        EngineConfig {
            max_prompt_tokens,
            context_budget_tokens: context_budget,
            history_limit: 4,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn test_prompt_contains_all_parts() {
        let builder = PromptBuilder::new("You are a quoting assistant.", &config(1000, 200));
        let history = vec![ChatTurn::new("s", "earlier question", "earlier answer")];
        let retrieval = retrieval_with_sections(&[20]);

        let (prompt, context) = builder.build(&history, &retrieval, "How much?").unwrap();

        assert!(prompt.starts_with("You are a quoting assistant."));
        assert!(prompt.contains("user: earlier question"));
        assert!(prompt.contains("assistant: earlier answer"));
        assert!(prompt.contains(&context.text));
        assert!(prompt.ends_with("User query: How much?"));
    }

    #[test]
    fn test_no_history_placeholder() {
        let builder = PromptBuilder::new("System.", &config(1000, 200));
        let (prompt, _) = builder
            .build(&[], &RetrievalResult::default(), "Hello")
            .unwrap();
        assert!(prompt.contains("No history"));
        assert!(prompt.contains("No relevant context found."));
    }

    #[test]
    fn test_oldest_history_dropped_first() {
        let builder = PromptBuilder::new("System.", &config(40, 0));
        let history = vec![
            ChatTurn::new("s", &words(30), "old answer"),
            ChatTurn::new("s", "recent question", "recent answer"),
        ];

        let (prompt, _) = builder
            .build(&history, &RetrievalResult::default(), "Next?")
            .unwrap();

        assert!(!prompt.contains("old answer"));
        assert!(prompt.contains("recent question"));
    }

    #[test]
    fn test_context_budget_shrinks_when_history_exhausted() {
        // Two 30-token sections; window fits only one of them
        let builder = PromptBuilder::new("System.", &config(55, 100));
        let retrieval = retrieval_with_sections(&[30, 30]);

        let (prompt, context) = builder.build(&[], &retrieval, "Next?").unwrap();

        assert!(context.truncated);
        assert!(context.token_count <= 50);
        assert!(count_tokens(&prompt) <= 55);
    }

    #[test]
    fn test_prompt_too_large_after_retries() {
        // User message alone exceeds the window; nothing to shrink
        let builder = PromptBuilder::new("System.", &config(10, 50));
        let err = builder
            .build(&[], &RetrievalResult::default(), &words(50))
            .unwrap_err();

        assert!(matches!(err, EngineError::PromptTooLarge { .. }));
    }
}
