//! Persisted artifact loading
//!
//! The embedding index and the knowledge graph are loaded at startup
//! from two JSON artifacts produced by the offline build pipeline:
//! `chunks.json` (chunk id -> text + embedding, the index map) and
//! `entities.json` (entity and relation lists). Their formats are
//! otherwise opaque to the rest of the system.

use crate::{KnowledgeGraph, Result};
use quotemaster_core::{DocumentChunk, Entity, Relation};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// Default artifact file names under the data directory
pub const CHUNKS_FILE: &str = "chunks.json";
pub const ENTITIES_FILE: &str = "entities.json";

/// On-disk shape of `entities.json`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GraphArtifact {
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub relations: Vec<Relation>,
}

/// Load indexed chunks from `chunks.json`.
pub fn load_chunks(path: impl AsRef<Path>) -> Result<Vec<DocumentChunk>> {
    let raw = fs::read_to_string(path.as_ref())?;
    let chunks: Vec<DocumentChunk> = serde_json::from_str(&raw)?;
    info!(
        "Loaded {} chunks from {}",
        chunks.len(),
        path.as_ref().display()
    );
    Ok(chunks)
}

/// Write indexed chunks to `chunks.json`.
pub fn save_chunks(path: impl AsRef<Path>, chunks: &[DocumentChunk]) -> Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        fs::create_dir_all(parent)?;
    }
    let raw = serde_json::to_string_pretty(chunks)?;
    fs::write(path.as_ref(), raw)?;
    info!(
        "Saved {} chunks to {}",
        chunks.len(),
        path.as_ref().display()
    );
    Ok(())
}

/// Load the knowledge graph from `entities.json`.
pub fn load_graph(path: impl AsRef<Path>) -> Result<KnowledgeGraph> {
    let raw = fs::read_to_string(path.as_ref())?;
    let artifact: GraphArtifact = serde_json::from_str(&raw)?;
    let graph = KnowledgeGraph::from_parts(artifact.entities, artifact.relations);
    info!(
        "Loaded knowledge graph from {}: {} entities, {} relations",
        path.as_ref().display(),
        graph.entity_count(),
        graph.relation_count()
    );
    Ok(graph)
}
