//! NeuroGraph - Incremental knowledge graph synchronization engine
//!
//! NeuroGraph turns a stream of heterogeneous inputs (typed text, uploaded
//! files, audio, video, live voice) into a deduplicated knowledge graph
//! while tracking a dual-stream cognitive state: a "dorsal" score for
//! rigid, analytical content and a "ventral" score for chaotic, emotional
//! content.
//!
//! ## Architecture
//!
//! ```text
//!  text / files        audio / video          live voice (PCM)
//!       │                    │                       │
//!       │          transcribe / analyze     ┌────────▼────────┐
//!       │                    │              │   LiveBridge    │
//!       │                    │              │ frames ⇄ socket │
//!       │                    │              └────────┬────────┘
//!       │                    │                  utterances
//! ┌─────▼────────────────────▼───────────────────────▼─────────┐
//! │                        SyncEngine                           │
//! │  SourceStore ─▶ ExtractionGateway ─▶ scorer ─▶ EntityMerger │
//! │       │               │                 │           │       │
//! │  artifact log   entities + analysis  SystemState  GraphSnapshot
//! │                       │                                     │
//! │                 deep pass (rigid or long input)             │
//! └─────────────────────────┬───────────────────────────────────┘
//!                           │ watch / broadcast
//!                     HTTP API (axum)
//! ```
//!
//! ## Modules
//!
//! - [`graph`]: nodes, edges, snapshots, merge planning and provenance
//! - [`extraction`]: the semantic service boundary
//! - [`cognition`]: system state and dual-stream scoring
//! - [`engine`]: the ingestion pipeline
//! - [`live`]: real-time voice bridge
//! - [`server`]: HTTP API
//! - [`config`]: configuration management

pub mod cognition;
pub mod config;
pub mod engine;
pub mod error;
pub mod extraction;
pub mod graph;
pub mod live;
pub mod server;

pub use cognition::{CognitiveLoad, SystemState};
pub use config::NeuroGraphConfig;
pub use engine::{EngineEvent, SyncEngine};
pub use error::{Error, Result};
pub use extraction::{ExtractionGateway, SemanticService};
pub use graph::{GraphSnapshot, KnowledgeNode, SourceArtifact, SourceKind};
pub use live::{LiveBridge, LiveEvent};
