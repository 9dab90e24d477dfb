//! Entity resolution and merge
//!
//! Merging is split in two steps. [`EntityMerger::plan`] reads a snapshot
//! and decides, for every extracted entity, whether it reinforces an
//! existing node or creates a new one. [`GraphSnapshot::apply`] commits the
//! plan. Two plans computed against the same snapshot do not see each
//! other's creations, so committing both can leave two nodes with the same
//! label. The pipeline keeps planning and committing back to back to make
//! that window small, but does not close it.

use super::node::{label_key, KnowledgeEdge, KnowledgeNode, Position, StreamType};
use super::placement::SpatialPlacer;
use super::snapshot::GraphSnapshot;
use crate::extraction::{ExtractedRelation, ExtractionResult};
use std::collections::HashMap;
use uuid::Uuid;

/// Update to an existing node
#[derive(Debug, Clone, PartialEq)]
pub struct Reinforcement {
    pub node_id: Uuid,
    /// Overwrites the node's stream unconditionally
    pub stream: StreamType,
    /// Overwrites the node's description when present
    pub description: Option<String>,
}

/// The graph changes one extraction implies
#[derive(Debug, Clone, PartialEq)]
pub struct MergePlan {
    /// Artifact the extraction came from
    pub source_id: Uuid,
    /// Nodes to append
    pub creations: Vec<KnowledgeNode>,
    /// Existing nodes to update, in entity order
    pub reinforcements: Vec<Reinforcement>,
    /// Edges to append
    pub edges: Vec<KnowledgeEdge>,
}

impl MergePlan {
    pub fn new(source_id: Uuid) -> Self {
        Self {
            source_id,
            creations: Vec::new(),
            reinforcements: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.creations.is_empty() && self.reinforcements.is_empty() && self.edges.is_empty()
    }
}

/// Resolves extracted entities against the graph
pub struct EntityMerger<'a> {
    placer: &'a SpatialPlacer,
    anchor: Position,
}

impl<'a> EntityMerger<'a> {
    /// New nodes are placed around `anchor` within the placer's default radius.
    pub fn new(placer: &'a SpatialPlacer, anchor: Position) -> Self {
        Self { placer, anchor }
    }

    /// Decide how `extraction` from `source_id` changes `snapshot`.
    ///
    /// Entities are processed in array order. A name matching an existing
    /// label (case-insensitively, exact length) reinforces that node; the
    /// last mention wins the stream. Names repeated within the batch
    /// collapse into the single node created for the first occurrence.
    pub fn plan(
        &self,
        snapshot: &GraphSnapshot,
        source_id: Uuid,
        extraction: &ExtractionResult,
    ) -> MergePlan {
        let mut plan = MergePlan::new(source_id);
        let mut created: HashMap<String, usize> = HashMap::new();

        for entity in &extraction.entities {
            let key = label_key(&entity.name);

            if let Some(&index) = created.get(&key) {
                let node = &mut plan.creations[index];
                node.stream_dominance = entity.stream;
                if let Some(description) = &entity.description {
                    node.description = Some(description.clone());
                }
                continue;
            }

            if let Some(existing) = snapshot.find_by_label(&entity.name) {
                plan.reinforcements.push(Reinforcement {
                    node_id: existing.id,
                    stream: entity.stream,
                    description: entity.description.clone(),
                });
                continue;
            }

            let mut node = KnowledgeNode::new(
                entity.name.clone(),
                entity.category,
                entity.stream,
                self.placer.place_default(self.anchor),
            );
            node.description = entity.description.clone();
            node.add_source(source_id);
            created.insert(key, plan.creations.len());
            plan.creations.push(node);
        }

        plan.edges = resolve_relations(snapshot, &extraction.relations);

        tracing::debug!(
            source_id = %source_id,
            created = plan.creations.len(),
            reinforced = plan.reinforcements.len(),
            "Planned merge"
        );
        plan
    }
}

/// Map name-based relations to edges between node ids.
///
/// Not implemented: relations arrive keyed by entity name and no matching
/// policy (exact, fuzzy, id-based) or handling of references to entities
/// that do not exist yet has been chosen. Every relation is dropped.
pub fn resolve_relations(
    _snapshot: &GraphSnapshot,
    relations: &[ExtractedRelation],
) -> Vec<KnowledgeEdge> {
    if !relations.is_empty() {
        tracing::debug!(count = relations.len(), "Relations left unresolved");
    }
    Vec::new()
}
