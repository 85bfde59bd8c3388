//! Relations - typed edges between business entities

use serde::{Deserialize, Serialize};

/// Types of relationships between entities
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    /// A product requires a service to deliver
    Requires,
    /// A plan or package includes a service/product
    Includes,
    /// Two offerings are sold together; may form cycles
    BundledWith,
    /// An offering is priced at a tier
    PricedAt,
    /// An offering targets a client category
    OfferedTo,
    /// Generic association
    RelatedTo,
}

impl std::fmt::Display for RelationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelationType::Requires => write!(f, "requires"),
            RelationType::Includes => write!(f, "includes"),
            RelationType::BundledWith => write!(f, "bundled_with"),
            RelationType::PricedAt => write!(f, "priced_at"),
            RelationType::OfferedTo => write!(f, "offered_to"),
            RelationType::RelatedTo => write!(f, "related_to"),
        }
    }
}

/// A directed edge in the knowledge graph. The graph may contain
/// cycles; traversal is responsible for staying bounded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relation {
    /// Source entity id
    pub from_id: String,

    /// Target entity id
    pub to_id: String,

    /// Type of relationship
    pub relation_type: RelationType,

    /// Optional edge weight (0.0 - 1.0)
    #[serde(default)]
    pub weight: Option<f32>,
}

impl Relation {
    /// Create a new relation
    pub fn new(
        from_id: impl Into<String>,
        to_id: impl Into<String>,
        relation_type: RelationType,
    ) -> Self {
        Self {
            from_id: from_id.into(),
            to_id: to_id.into(),
            relation_type,
            weight: None,
        }
    }

    /// Builder: set weight
    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = Some(weight.clamp(0.0, 1.0));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relation_creation() {
        let relation = Relation::new("p1", "s1", RelationType::Requires).with_weight(0.9);

        assert_eq!(relation.from_id, "p1");
        assert_eq!(relation.to_id, "s1");
        assert_eq!(relation.weight, Some(0.9));
    }

    #[test]
    fn test_relation_type_display() {
        assert_eq!(RelationType::Requires.to_string(), "requires");
        assert_eq!(RelationType::BundledWith.to_string(), "bundled_with");
    }
}
