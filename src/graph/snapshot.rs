//! Immutable graph snapshots
//!
//! The node and edge collections are never mutated in place. Every change
//! is expressed as a function from the current snapshot to a new one, so a
//! reader holding a snapshot sees a consistent graph no matter what is
//! committed afterwards.

use super::merger::MergePlan;
use super::node::{KnowledgeEdge, KnowledgeNode, Position};
use crate::error::{Error, Result};
use serde::Serialize;
use uuid::Uuid;

/// A consistent view of the knowledge graph
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<KnowledgeNode>,
    pub edges: Vec<KnowledgeEdge>,
}

impl GraphSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a node whose label matches case-insensitively
    pub fn find_by_label(&self, label: &str) -> Option<&KnowledgeNode> {
        self.nodes.iter().find(|n| n.matches_label(label))
    }

    /// All nodes whose label matches case-insensitively
    pub fn nodes_labeled(&self, label: &str) -> Vec<&KnowledgeNode> {
        self.nodes.iter().filter(|n| n.matches_label(label)).collect()
    }

    /// Get a node by ID
    pub fn node(&self, id: &Uuid) -> Option<&KnowledgeNode> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Derive the snapshot that results from committing `plan`.
    ///
    /// Reinforcements are applied in plan order by node id; creations are
    /// appended as-is. Nothing here re-checks labels: a plan computed
    /// against an older snapshot may introduce a duplicate label.
    pub fn apply(&self, plan: &MergePlan) -> GraphSnapshot {
        let mut next = self.clone();

        for reinforcement in &plan.reinforcements {
            match next.nodes.iter_mut().find(|n| n.id == reinforcement.node_id) {
                Some(node) => {
                    node.add_source(plan.source_id);
                    node.stream_dominance = reinforcement.stream;
                    if let Some(description) = &reinforcement.description {
                        node.description = Some(description.clone());
                    }
                }
                None => {
                    tracing::warn!(
                        node_id = %reinforcement.node_id,
                        source_id = %plan.source_id,
                        "Reinforcement targets a node missing from the snapshot"
                    );
                }
            }
        }

        next.nodes.extend(plan.creations.iter().cloned());
        next.edges.extend(plan.edges.iter().cloned());
        next
    }

    /// Derive a snapshot with `node` added, unless its label already exists.
    ///
    /// Returns the snapshot and the id of the node carrying the label.
    pub fn with_node(&self, node: KnowledgeNode) -> (GraphSnapshot, Uuid) {
        if let Some(existing) = self.find_by_label(&node.label) {
            return (self.clone(), existing.id);
        }
        let id = node.id;
        let mut next = self.clone();
        next.nodes.push(node);
        (next, id)
    }

    /// Derive a snapshot with one node moved to `position`.
    pub fn with_position(&self, id: &Uuid, position: Position) -> Result<GraphSnapshot> {
        let mut next = self.clone();
        let node = next
            .nodes
            .iter_mut()
            .find(|n| &n.id == id)
            .ok_or_else(|| Error::NotFound(format!("node {}", id)))?;
        node.position = position;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::merger::Reinforcement;
    use crate::graph::node::{NodeCategory, StreamType};

    fn node(label: &str) -> KnowledgeNode {
        KnowledgeNode::new(label, NodeCategory::Concept, StreamType::Dorsal, Position::default())
    }

    #[test]
    fn test_apply_does_not_touch_original() {
        let base = GraphSnapshot::new();
        let source_id = Uuid::new_v4();
        let plan = MergePlan {
            source_id,
            creations: vec![node("Focus")],
            reinforcements: vec![],
            edges: vec![],
        };

        let next = base.apply(&plan);
        assert_eq!(base.node_count(), 0);
        assert_eq!(next.node_count(), 1);
    }

    #[test]
    fn test_apply_reinforcement() {
        let existing = node("Focus");
        let id = existing.id;
        let base = GraphSnapshot {
            nodes: vec![existing],
            edges: vec![],
        };
        let source_id = Uuid::new_v4();
        let plan = MergePlan {
            source_id,
            creations: vec![],
            reinforcements: vec![Reinforcement {
                node_id: id,
                stream: StreamType::Ventral,
                description: Some("attention".to_string()),
            }],
            edges: vec![],
        };

        let next = base.apply(&plan);
        let updated = next.node(&id).unwrap();
        assert_eq!(updated.stream_dominance, StreamType::Ventral);
        assert_eq!(updated.source_ids, vec![source_id]);
        assert_eq!(updated.description.as_deref(), Some("attention"));

        // Applying again is idempotent for source ids
        let again = next.apply(&plan);
        assert_eq!(again.node(&id).unwrap().source_ids, vec![source_id]);
    }

    #[test]
    fn test_apply_keeps_description_when_absent() {
        let mut existing = node("Focus");
        existing.description = Some("kept".to_string());
        let id = existing.id;
        let base = GraphSnapshot {
            nodes: vec![existing],
            edges: vec![],
        };
        let plan = MergePlan {
            source_id: Uuid::new_v4(),
            creations: vec![],
            reinforcements: vec![Reinforcement {
                node_id: id,
                stream: StreamType::Dorsal,
                description: None,
            }],
            edges: vec![],
        };
        assert_eq!(base.apply(&plan).node(&id).unwrap().description.as_deref(), Some("kept"));
    }

    #[test]
    fn test_with_node_respects_label_invariant() {
        let (snapshot, first) = GraphSnapshot::new().with_node(node("Deadline"));
        let (snapshot, second) = snapshot.with_node(node("DEADLINE"));
        assert_eq!(first, second);
        assert_eq!(snapshot.node_count(), 1);
    }

    #[test]
    fn test_with_position() {
        let (snapshot, id) = GraphSnapshot::new().with_node(node("Focus"));
        let moved = snapshot.with_position(&id, Position::new(10.0, -4.0)).unwrap();
        assert_eq!(moved.node(&id).unwrap().position, Position::new(10.0, -4.0));
        assert_eq!(snapshot.node(&id).unwrap().position, Position::default());

        let err = snapshot
            .with_position(&Uuid::new_v4(), Position::default())
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
