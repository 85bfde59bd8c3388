//! Business knowledge graph
//!
//! Directed graph of services, products, pricing tiers, and client
//! categories. Read-only after construction; population is an
//! external batch process. The graph may contain cycles (for example
//! mutual `bundled_with` edges), so traversal keeps an explicit
//! visited set and a bounded depth.

use crate::{Result, StoreError};
use quotemaster_core::{Entity, EntityType, Relation, RelationType};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

/// The knowledge graph store.
#[derive(Debug, Default)]
pub struct KnowledgeGraph {
    entities: HashMap<String, Entity>,
    /// Entity ids in insertion order, for stable iteration
    order: Vec<String>,
    /// Outgoing edges per entity id
    outgoing: HashMap<String, Vec<Relation>>,
    relation_count: usize,
    /// Lowercased name/alias -> entity id, in insertion order
    name_index: Vec<(String, String)>,
}

impl KnowledgeGraph {
    /// An empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from entities and relations. Relations whose
    /// endpoints are unknown are skipped.
    pub fn from_parts(entities: Vec<Entity>, relations: Vec<Relation>) -> Self {
        let mut graph = Self::new();

        for entity in entities {
            for key in entity.match_keys() {
                graph.name_index.push((key, entity.id.clone()));
            }
            graph.order.push(entity.id.clone());
            graph.entities.insert(entity.id.clone(), entity);
        }

        for relation in relations {
            if !graph.entities.contains_key(&relation.from_id)
                || !graph.entities.contains_key(&relation.to_id)
            {
                debug!(
                    "Skipping relation {} -> {}: unknown endpoint",
                    relation.from_id, relation.to_id
                );
                continue;
            }
            graph
                .outgoing
                .entry(relation.from_id.clone())
                .or_default()
                .push(relation);
            graph.relation_count += 1;
        }

        graph
    }

    /// Look up an entity by id.
    pub fn lookup(&self, entity_id: &str) -> Result<&Entity> {
        self.entities
            .get(entity_id)
            .ok_or_else(|| StoreError::EntityNotFound(entity_id.to_string()))
    }

    /// All entities of one type, in insertion order.
    pub fn find_by_type(&self, entity_type: EntityType) -> Vec<&Entity> {
        self.order
            .iter()
            .filter_map(|id| self.entities.get(id))
            .filter(|e| e.entity_type == entity_type)
            .collect()
    }

    /// Breadth-first neighborhood of an entity up to `max_depth` hops,
    /// optionally filtered by relation type.
    ///
    /// Cycle-safe: each node is visited at most once and the start
    /// node is excluded from the result. Returned in BFS order.
    pub fn neighbors(
        &self,
        entity_id: &str,
        relation_type: Option<RelationType>,
        max_depth: usize,
    ) -> Result<Vec<&Entity>> {
        // Validate the start node up front
        self.lookup(entity_id)?;

        let mut visited: HashSet<&str> = HashSet::new();
        visited.insert(entity_id);

        let mut result = Vec::new();
        let mut frontier: VecDeque<(&str, usize)> = VecDeque::new();
        frontier.push_back((entity_id, 0));

        while let Some((current, depth)) = frontier.pop_front() {
            if depth == max_depth {
                continue;
            }
            for relation in self.relations_from(current) {
                if let Some(filter) = relation_type {
                    if relation.relation_type != filter {
                        continue;
                    }
                }
                if visited.insert(relation.to_id.as_str()) {
                    if let Some(entity) = self.entities.get(&relation.to_id) {
                        result.push(entity);
                        frontier.push_back((relation.to_id.as_str(), depth + 1));
                    }
                }
            }
        }

        Ok(result)
    }

    /// Outgoing relations of an entity.
    pub fn relations_from(&self, entity_id: &str) -> &[Relation] {
        self.outgoing
            .get(entity_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Entities whose name or alias occurs in `text` (case-insensitive
    /// substring match). Deduplicated, first match order preserved.
    pub fn match_names(&self, text: &str) -> Vec<&Entity> {
        let haystack = text.to_lowercase();
        let mut seen = HashSet::new();
        let mut matches = Vec::new();

        for (key, id) in &self.name_index {
            if haystack.contains(key.as_str()) && seen.insert(id.as_str()) {
                if let Some(entity) = self.entities.get(id) {
                    matches.push(entity);
                }
            }
        }

        matches
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn relation_count(&self) -> usize {
        self.relation_count
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_graph() -> KnowledgeGraph {
        let entities = vec![
            Entity::new("p1", "Website Development", EntityType::Product)
                .with_attribute("description", "Custom website development service"),
            Entity::new("p2", "Mobile App", EntityType::Product)
                .with_attribute("description", "Cross-platform mobile application"),
            Entity::new("s1", "UI/UX Design", EntityType::Service)
                .with_alias("ui ux")
                .with_attribute("description", "User interface and experience design"),
            Entity::new("s2", "Backend Development", EntityType::Service),
            Entity::new("t1", "Startup Plan", EntityType::PricingTier)
                .with_attribute("rate", "25000 INR"),
        ];
        let relations = vec![
            Relation::new("p1", "s1", RelationType::Requires),
            Relation::new("p2", "s1", RelationType::Requires),
            Relation::new("p1", "s2", RelationType::Requires),
            Relation::new("s1", "t1", RelationType::PricedAt),
        ];
        KnowledgeGraph::from_parts(entities, relations)
    }

    #[test]
    fn test_lookup() {
        let graph = sample_graph();
        assert_eq!(graph.lookup("p1").unwrap().name, "Website Development");
        assert!(matches!(
            graph.lookup("nope").unwrap_err(),
            StoreError::EntityNotFound(_)
        ));
    }

    #[test]
    fn test_find_by_type() {
        let graph = sample_graph();
        let services = graph.find_by_type(EntityType::Service);
        assert_eq!(services.len(), 2);
        assert_eq!(services[0].name, "UI/UX Design");

        let tiers = graph.find_by_type(EntityType::PricingTier);
        assert_eq!(tiers.len(), 1);
    }

    #[test]
    fn test_neighbors_depth_one() {
        let graph = sample_graph();
        let ids: Vec<&str> = graph
            .neighbors("p1", None, 1)
            .unwrap()
            .iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(ids, vec!["s1", "s2"]);
    }

    #[test]
    fn test_neighbors_depth_two_reaches_tier() {
        let graph = sample_graph();
        let ids: Vec<&str> = graph
            .neighbors("p1", None, 2)
            .unwrap()
            .iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(ids, vec!["s1", "s2", "t1"]);
    }

    #[test]
    fn test_neighbors_relation_filter() {
        let graph = sample_graph();
        let ids: Vec<&str> = graph
            .neighbors("p1", Some(RelationType::Requires), 2)
            .unwrap()
            .iter()
            .map(|e| e.id.as_str())
            .collect();
        // priced_at edge filtered out, tier unreachable
        assert_eq!(ids, vec!["s1", "s2"]);
    }

    #[test]
    fn test_neighbors_unknown_start() {
        let graph = sample_graph();
        assert!(matches!(
            graph.neighbors("missing", None, 2).unwrap_err(),
            StoreError::EntityNotFound(_)
        ));
    }

    #[test]
    fn test_cycle_terminates_and_excludes_self() {
        let entities = vec![
            Entity::new("a", "Hosting", EntityType::Product),
            Entity::new("b", "SSL Certificate", EntityType::Product),
        ];
        let relations = vec![
            Relation::new("a", "b", RelationType::BundledWith),
            Relation::new("b", "a", RelationType::BundledWith),
        ];
        let graph = KnowledgeGraph::from_parts(entities, relations);

        let ids: Vec<&str> = graph
            .neighbors("a", None, 5)
            .unwrap()
            .iter()
            .map(|e| e.id.as_str())
            .collect();
        // A -> B -> A cycle: only B, no revisit, no infinite loop
        assert_eq!(ids, vec!["b"]);
    }

    #[test]
    fn test_relation_with_missing_endpoint_skipped() {
        let entities = vec![Entity::new("a", "A", EntityType::Product)];
        let relations = vec![Relation::new("a", "ghost", RelationType::RelatedTo)];
        let graph = KnowledgeGraph::from_parts(entities, relations);
        assert_eq!(graph.relation_count(), 0);
    }

    #[test]
    fn test_match_names() {
        let graph = sample_graph();
        let ids: Vec<&str> = graph
            .match_names("How much does ui ux design cost for a mobile app?")
            .iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(ids, vec!["p2", "s1"]);
    }

    #[test]
    fn test_match_names_no_hit() {
        let graph = sample_graph();
        assert!(graph.match_names("tell me a joke").is_empty());
    }
}
