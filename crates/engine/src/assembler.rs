//! Context assembler - renders retrieval results under a token budget
//!
//! Chunks render first in relevance order, then graph facts in entity
//! relevance order. Accounting is per section: the first section that
//! would exceed the budget is dropped wholesale (along with everything
//! after it) so the output never ends mid-sentence. Assembly never
//! fails; the worst case is an empty, truncated context.

use quotemaster_core::{count_tokens, AssembledContext, RetrievalResult};
use std::collections::HashMap;
use tracing::debug;

/// Stateless renderer for assembled context blocks.
#[derive(Debug, Default, Clone)]
pub struct ContextAssembler;

impl ContextAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Merge retrieved chunks and graph facts into one bounded block.
    /// Guarantees `token_count <= budget_tokens`.
    pub fn assemble(&self, retrieval: &RetrievalResult, budget_tokens: usize) -> AssembledContext {
        let sections = render_sections(retrieval);
        if sections.is_empty() {
            return AssembledContext::empty();
        }

        let mut included: Vec<String> = Vec::new();
        let mut token_count = 0usize;
        let mut truncated = false;

        for section in sections {
            let tokens = count_tokens(&section);
            if token_count + tokens > budget_tokens {
                truncated = true;
                break;
            }
            token_count += tokens;
            included.push(section);
        }

        if truncated {
            debug!(
                "Context truncated at {} of {} budget tokens",
                token_count, budget_tokens
            );
        }

        AssembledContext {
            text: included.join("\n\n"),
            token_count,
            truncated,
        }
    }
}

/// Render each chunk and each entity fact block as one section.
fn render_sections(retrieval: &RetrievalResult) -> Vec<String> {
    let mut sections = Vec::new();

    for (i, scored) in retrieval.chunks.iter().enumerate() {
        sections.push(format!(
            "Document {} (relevance: {:.2}):\n{}",
            i + 1,
            scored.score,
            scored.chunk.text
        ));
    }

    let names: HashMap<&str, &quotemaster_core::Entity> = retrieval
        .entities
        .iter()
        .map(|e| (e.id.as_str(), e))
        .collect();

    for entity in &retrieval.entities {
        let mut lines = vec![format!("{}: {}", entity.entity_type, entity.name)];

        for (key, value) in &entity.attributes {
            lines.push(format!("  - {}: {}", key, value));
        }

        for relation in retrieval
            .relations
            .iter()
            .filter(|r| r.from_id == entity.id)
        {
            if let Some(target) = names.get(relation.to_id.as_str()) {
                lines.push(format!(
                    "  - {}: {} ({})",
                    relation.relation_type, target.name, target.entity_type
                ));
            }
        }

        sections.push(lines.join("\n"));
    }

    sections
}
