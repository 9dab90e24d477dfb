//! Knowledge node and edge types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Entity category of a knowledge node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeCategory {
    Concept,
    Person,
    Event,
    Process,
    /// Created from user-side live interaction
    User,
    /// Created from system-side live interaction
    System,
}

impl NodeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeCategory::Concept => "concept",
            NodeCategory::Person => "person",
            NodeCategory::Event => "event",
            NodeCategory::Process => "process",
            NodeCategory::User => "user",
            NodeCategory::System => "system",
        }
    }
}

impl fmt::Display for NodeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "concept" => Ok(NodeCategory::Concept),
            "person" => Ok(NodeCategory::Person),
            "event" => Ok(NodeCategory::Event),
            "process" => Ok(NodeCategory::Process),
            "user" => Ok(NodeCategory::User),
            "system" => Ok(NodeCategory::System),
            other => Err(format!("unknown node category '{}'", other)),
        }
    }
}

/// Cognitive mode an entity is associated with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamType {
    /// Structure, action, logic
    Dorsal,
    /// Meaning, perception, affect
    Ventral,
}

impl StreamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamType::Dorsal => "dorsal",
            StreamType::Ventral => "ventral",
        }
    }
}

impl fmt::Display for StreamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreamType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dorsal" => Ok(StreamType::Dorsal),
            "ventral" => Ok(StreamType::Ventral),
            other => Err(format!("unknown stream '{}'", other)),
        }
    }
}

/// Canvas coordinates of a node
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: &Position) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Dedup key for a label: labels are compared case-insensitively, with no
/// trimming, stemming or fuzzy matching.
pub fn label_key(label: &str) -> String {
    label.to_lowercase()
}

/// A deduplicated entity extracted from one or more source artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeNode {
    /// Unique node identifier
    pub id: Uuid,
    /// Display name, also the dedup key
    pub label: String,
    /// Entity category (fixed at creation)
    pub category: NodeCategory,
    /// Stream of the most recent mention
    pub stream_dominance: StreamType,
    /// Artifacts that mentioned this entity, in first-mention order
    pub source_ids: Vec<Uuid>,
    /// Last written description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Fixed at creation
    pub confidence: f64,
    /// Canvas placement overlay
    pub position: Position,
}

impl KnowledgeNode {
    /// Confidence assigned to every newly created node
    pub const INITIAL_CONFIDENCE: f64 = 1.0;

    /// Create a node with a fresh id and no sources
    pub fn new(
        label: impl Into<String>,
        category: NodeCategory,
        stream: StreamType,
        position: Position,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            label: label.into(),
            category,
            stream_dominance: stream,
            source_ids: Vec::new(),
            description: None,
            confidence: Self::INITIAL_CONFIDENCE,
            position,
        }
    }

    /// Whether this node's label matches `label` case-insensitively
    pub fn matches_label(&self, label: &str) -> bool {
        label_key(&self.label) == label_key(label)
    }

    /// Record a mention by `source_id`; repeated mentions are idempotent.
    ///
    /// Returns `true` if the id was newly added.
    pub fn add_source(&mut self, source_id: Uuid) -> bool {
        if self.source_ids.contains(&source_id) {
            return false;
        }
        self.source_ids.push(source_id);
        true
    }
}

/// A relation between two knowledge nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeEdge {
    pub id: Uuid,
    pub source_node_id: Uuid,
    pub target_node_id: Uuid,
    /// Relation label, e.g. "CAUSES", "IS_A", "FEELS"
    pub relation: String,
    pub weight: f64,
}
