//! Business entities - services, products, pricing tiers

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The type/classification of a business entity
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// A billable service (UI/UX design, backend development, ...)
    Service,
    /// A deliverable product (website, mobile app, ...)
    Product,
    /// A pricing tier or plan
    PricingTier,
    /// A category of client (startup, enterprise, ...)
    ClientCategory,
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityType::Service => write!(f, "Service"),
            EntityType::Product => write!(f, "Product"),
            EntityType::PricingTier => write!(f, "Pricing tier"),
            EntityType::ClientCategory => write!(f, "Client category"),
        }
    }
}

/// A node in the business knowledge graph. Read-only from the
/// retrieval layer's perspective; graph population is an external
/// batch process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// Unique identifier (e.g. "svc-uiux")
    pub id: String,

    /// The type of entity
    pub entity_type: EntityType,

    /// Display name
    pub name: String,

    /// Alternate names matched during mention extraction
    #[serde(default)]
    pub aliases: Vec<String>,

    /// Free-form attributes (description, rate, timeline, ...)
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl Entity {
    /// Create a new entity
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        entity_type: EntityType,
    ) -> Self {
        Self {
            id: id.into(),
            entity_type,
            name: name.into(),
            aliases: Vec::new(),
            attributes: BTreeMap::new(),
        }
    }

    /// Builder: add an attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Builder: add an alias
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// All names this entity can be matched by, lowercased
    pub fn match_keys(&self) -> impl Iterator<Item = String> + '_ {
        std::iter::once(self.name.to_lowercase())
            .chain(self.aliases.iter().map(|a| a.to_lowercase()))
    }
}
