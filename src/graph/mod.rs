//! Knowledge graph model
//!
//! Source artifacts, knowledge nodes and the merge of extraction results
//! into immutable graph snapshots.

mod merger;
mod node;
mod placement;
mod snapshot;
mod source;
mod source_store;

pub use merger::{resolve_relations, EntityMerger, MergePlan, Reinforcement};
pub use node::{label_key, KnowledgeEdge, KnowledgeNode, NodeCategory, Position, StreamType};
pub use placement::{sample_in_disk, SpatialPlacer};
pub use snapshot::GraphSnapshot;
pub use source::{SourceArtifact, SourceArtifactBuilder, SourceKind};
pub use source_store::SourceStore;
