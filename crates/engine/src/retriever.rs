//! Retriever - vector and graph lookup for one query
//!
//! A retrieval-layer fault never fails the turn: if the embedding
//! function or the vector index is unavailable the retriever logs,
//! returns an empty chunk list, and proceeds with graph-only results.

use crate::llm::Embedder;
use crate::EngineConfig;
use quotemaster_core::{Entity, Relation, RetrievalResult};
use quotemaster_store::{EmbeddingStore, KnowledgeGraph};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Produces a ranked set of chunks and graph facts for a query.
pub struct Retriever {
    store: Arc<EmbeddingStore>,
    graph: Arc<KnowledgeGraph>,
    embedder: Arc<dyn Embedder>,
    top_k: usize,
    top_n: usize,
    graph_depth: usize,
}

impl Retriever {
    pub fn new(
        store: Arc<EmbeddingStore>,
        graph: Arc<KnowledgeGraph>,
        embedder: Arc<dyn Embedder>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            store,
            graph,
            embedder,
            top_k: config.top_k,
            top_n: config.top_n,
            graph_depth: config.graph_depth,
        }
    }

    /// Retrieve relevant chunks and entities for a query.
    #[instrument(skip(self))]
    pub async fn retrieve(&self, query: &str) -> RetrievalResult {
        let chunks = match self.embedder.embed(query).await {
            Ok(embedding) => match self.store.search(&embedding, self.top_k) {
                Ok(results) => results,
                Err(e) => {
                    warn!("Vector search unavailable, degrading to graph-only: {}", e);
                    Vec::new()
                }
            },
            Err(e) => {
                warn!("Query embedding failed, degrading to graph-only: {}", e);
                Vec::new()
            }
        };

        let (entities, relations) = self.graph_lookup(query);

        debug!(
            "Retrieved {} chunks, {} entities, {} relations",
            chunks.len(),
            entities.len(),
            relations.len()
        );

        RetrievalResult {
            chunks,
            entities,
            relations,
        }
    }

    /// Mention-matched entities plus their graph neighborhood, capped
    /// at `top_n`, deduplicated by id.
    fn graph_lookup(&self, query: &str) -> (Vec<Entity>, Vec<Relation>) {
        let mut seen: HashSet<String> = HashSet::new();
        let mut entities: Vec<Entity> = Vec::new();

        // Seeds first, in mention order; category-level queries pull
        // in the whole entity class ("all pricing tiers")
        let mut seeds: Vec<String> = self
            .graph
            .match_names(query)
            .into_iter()
            .map(|e| e.id.clone())
            .collect();

        if let Some(entity_type) = category_query(query) {
            for entity in self.graph.find_by_type(entity_type) {
                seeds.push(entity.id.clone());
            }
        }

        for seed_id in &seeds {
            if let Ok(entity) = self.graph.lookup(seed_id) {
                if seen.insert(entity.id.clone()) {
                    entities.push(entity.clone());
                }
            }
        }

        // Then each seed's neighborhood
        for seed_id in &seeds {
            match self.graph.neighbors(seed_id, None, self.graph_depth) {
                Ok(neighbors) => {
                    for entity in neighbors {
                        if seen.insert(entity.id.clone()) {
                            entities.push(entity.clone());
                        }
                    }
                }
                Err(e) => debug!("Neighbor lookup failed for {}: {}", seed_id, e),
            }
        }

        entities.truncate(self.top_n);
        let selected: HashSet<&str> = entities.iter().map(|e| e.id.as_str()).collect();

        // Relations with both endpoints in the selected set
        let relations: Vec<Relation> = entities
            .iter()
            .flat_map(|e| self.graph.relations_from(&e.id))
            .filter(|r| selected.contains(r.to_id.as_str()))
            .cloned()
            .collect();

        (entities, relations)
    }
}

/// Map category wording in a query to an entity class.
fn category_query(query: &str) -> Option<quotemaster_core::EntityType> {
    let query = query.to_lowercase();
    if query.contains("pricing tier") || query.contains("pricing plan") || query.contains("plans") {
        Some(quotemaster_core::EntityType::PricingTier)
    } else if query.contains("all services") || query.contains("which services") {
        Some(quotemaster_core::EntityType::Service)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::Result;
    use async_trait::async_trait;
    use quotemaster_core::{DocumentChunk, EntityType, RelationType};

    struct FixedEmbedder(Vec<f32>);

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(self.0.clone())
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(EngineError::LlmUnavailable("embedding service down".into()))
        }
    }

    fn sample_graph() -> KnowledgeGraph {
        KnowledgeGraph::from_parts(
            vec![
                quotemaster_core::Entity::new("p1", "Website Development", EntityType::Product),
                quotemaster_core::Entity::new("s1", "UI/UX Design", EntityType::Service),
                quotemaster_core::Entity::new("t1", "Startup Plan", EntityType::PricingTier),
            ],
            vec![
                Relation::new("p1", "s1", RelationType::Requires),
                Relation::new("s1", "t1", RelationType::PricedAt),
            ],
        )
    }

    fn built_store() -> EmbeddingStore {
        let store = EmbeddingStore::new();
        store
            .build(vec![
                DocumentChunk::new(0, "Website development quote").with_embedding(vec![1.0, 0.0]),
                DocumentChunk::new(1, "Logo design quote").with_embedding(vec![0.0, 1.0]),
            ])
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_retrieve_combines_chunks_and_graph() {
        let retriever = Retriever::new(
            Arc::new(built_store()),
            Arc::new(sample_graph()),
            Arc::new(FixedEmbedder(vec![1.0, 0.0])),
            &EngineConfig::default(),
        );

        let result = retriever.retrieve("Quote for website development please").await;

        assert_eq!(result.chunks.len(), 2);
        assert_eq!(result.chunks[0].chunk.text, "Website development quote");
        // Seed p1 plus depth-2 neighborhood s1, t1
        let ids: Vec<&str> = result.entities.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "s1", "t1"]);
        assert_eq!(result.relations.len(), 2);
    }

    #[tokio::test]
    async fn test_embedding_failure_degrades_to_graph_only() {
        let retriever = Retriever::new(
            Arc::new(built_store()),
            Arc::new(sample_graph()),
            Arc::new(FailingEmbedder),
            &EngineConfig::default(),
        );

        let result = retriever.retrieve("website development cost").await;

        assert!(result.chunks.is_empty());
        assert!(!result.entities.is_empty());
    }

    #[tokio::test]
    async fn test_unbuilt_index_degrades_to_graph_only() {
        let retriever = Retriever::new(
            Arc::new(EmbeddingStore::new()),
            Arc::new(sample_graph()),
            Arc::new(FixedEmbedder(vec![1.0, 0.0])),
            &EngineConfig::default(),
        );

        let result = retriever.retrieve("website development cost").await;

        assert!(result.chunks.is_empty());
        assert!(!result.entities.is_empty());
    }

    #[tokio::test]
    async fn test_category_query_pulls_tier_class() {
        let retriever = Retriever::new(
            Arc::new(built_store()),
            Arc::new(sample_graph()),
            Arc::new(FixedEmbedder(vec![1.0, 0.0])),
            &EngineConfig::default(),
        );

        let result = retriever.retrieve("What pricing plans do you offer?").await;

        let ids: Vec<&str> = result.entities.iter().map(|e| e.id.as_str()).collect();
        assert!(ids.contains(&"t1"));
    }

    #[tokio::test]
    async fn test_top_n_cap() {
        let config = EngineConfig {
            top_n: 2,
            ..EngineConfig::default()
        };
        let retriever = Retriever::new(
            Arc::new(built_store()),
            Arc::new(sample_graph()),
            Arc::new(FixedEmbedder(vec![1.0, 0.0])),
            &config,
        );

        let result = retriever.retrieve("website development").await;
        assert_eq!(result.entities.len(), 2);
    }
}
