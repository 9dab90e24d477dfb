//! Knowledge graph synchronization engine
//!
//! `SyncEngine` owns the live graph and system state and runs every
//! ingestion through the same sequence:
//!
//! ```text
//! ingest(text) ─▶ record artifact ─▶ queue+1 ─▶ extract ─┬─▶ score
//!                                                         └─▶ merge ─▶ queue-1
//!                                                                       │
//!                            rigidity > 80 or > 100 chars ─▶ deep pass ◀┘
//! ```
//!
//! State lives in `watch` channels and is only replaced with snapshots
//! derived from the current value. Steps on either side of an `.await` are
//! not atomic together: two ingestions extracting the same new entity at
//! the same time may each create a node for it.

use super::tracker::{ProcessingTracker, QueueGuard};
use crate::cognition::{apply_analysis, SystemState};
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::extraction::ExtractionGateway;
use crate::graph::{
    EntityMerger, GraphSnapshot, KnowledgeNode, NodeCategory, Position, SourceArtifact,
    SourceArtifactBuilder, SourceKind, SourceStore, SpatialPlacer, StreamType,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Rigidity strictly above this triggers the deep pass
pub const DEEP_PASS_RIGIDITY: f64 = 80.0;

/// Content longer than this many characters triggers the deep pass
pub const DEEP_PASS_CHARS: usize = 100;

/// Notification published by the engine
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    SourceRecorded {
        source_id: Uuid,
        kind: SourceKind,
    },
    GraphMerged {
        source_id: Uuid,
        created: usize,
        reinforced: usize,
    },
    /// Output of the deep pass; not merged into the graph
    DeepResponse {
        source_id: Uuid,
        text: String,
    },
    NodeAdded {
        node_id: Uuid,
    },
    LiveStatus {
        active: bool,
    },
}

/// Whether an ingestion warrants the deep pass
pub fn needs_deep_pass(rigidity: f64, content: &str) -> bool {
    rigidity > DEEP_PASS_RIGIDITY || content.chars().count() > DEEP_PASS_CHARS
}

struct EngineInner {
    sources: SourceStore,
    gateway: ExtractionGateway,
    placer: SpatialPlacer,
    anchor: Position,
    graph: watch::Sender<Arc<GraphSnapshot>>,
    state: Arc<watch::Sender<SystemState>>,
    tracker: ProcessingTracker,
    events: broadcast::Sender<EngineEvent>,
}

/// Ingestion entry point and owner of the graph and system state
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<EngineInner>,
}

/// Builder for [`SyncEngine`]
pub struct SyncEngineBuilder {
    gateway: ExtractionGateway,
    placer: Option<SpatialPlacer>,
    anchor: Position,
    max_radius: f64,
    event_capacity: usize,
}

impl SyncEngineBuilder {
    pub fn new(gateway: ExtractionGateway) -> Self {
        let defaults = PipelineConfig::default();
        Self {
            gateway,
            placer: None,
            anchor: Position::new(defaults.anchor_x, defaults.anchor_y),
            max_radius: defaults.max_radius,
            event_capacity: defaults.event_capacity,
        }
    }

    /// Apply anchor, radius and channel capacity from configuration
    pub fn config(mut self, config: &PipelineConfig) -> Self {
        self.anchor = Position::new(config.anchor_x, config.anchor_y);
        self.max_radius = config.max_radius;
        self.event_capacity = config.event_capacity;
        self
    }

    /// Point new nodes are placed around
    pub fn anchor(mut self, anchor: Position) -> Self {
        self.anchor = anchor;
        self
    }

    /// Use a specific placer (e.g. a seeded one); overrides `max_radius`
    pub fn placer(mut self, placer: SpatialPlacer) -> Self {
        self.placer = Some(placer);
        self
    }

    pub fn build(self) -> SyncEngine {
        let (graph, _) = watch::channel(Arc::new(GraphSnapshot::new()));
        let (state, _) = watch::channel(SystemState::default());
        let state = Arc::new(state);
        let (events, _) = broadcast::channel(self.event_capacity.max(1));

        SyncEngine {
            inner: Arc::new(EngineInner {
                sources: SourceStore::new(),
                gateway: self.gateway,
                placer: self
                    .placer
                    .unwrap_or_else(|| SpatialPlacer::new(self.max_radius)),
                anchor: self.anchor,
                graph,
                tracker: ProcessingTracker::new(state.clone()),
                state,
                events,
            }),
        }
    }
}

impl SyncEngine {
    pub fn builder(gateway: ExtractionGateway) -> SyncEngineBuilder {
        SyncEngineBuilder::new(gateway)
    }

    // =========================================================================
    // Ingestion
    // =========================================================================

    /// Fire-and-forget text ingestion.
    ///
    /// Results are observed through the state and graph snapshots. The
    /// handle only exists so callers that care can wait for settlement.
    pub fn ingest(&self, content: impl Into<String>) -> JoinHandle<()> {
        let engine = self.clone();
        let content = content.into();
        tokio::spawn(async move {
            if let Err(e) = engine.process_text(content).await {
                tracing::error!(error = %e, "Text ingestion rejected");
            }
        })
    }

    /// Record `content` as a text artifact and run it through the pipeline.
    pub async fn process_text(&self, content: impl Into<String>) -> Result<SourceArtifact> {
        let artifact = self
            .inner
            .sources
            .record(SourceKind::Text, "text/plain", content)
            .await?;
        self.announce(&artifact);
        let guard = self.inner.tracker.begin();
        self.run(&artifact, guard).await;
        Ok(artifact)
    }

    /// Validate and record an artifact, then process it in the background.
    ///
    /// Validation failures are returned before anything is recorded.
    pub async fn submit(&self, builder: SourceArtifactBuilder) -> Result<SourceArtifact> {
        let artifact = self.inner.sources.append(builder.build()?).await;
        self.announce(&artifact);

        let guard = self.inner.tracker.begin();
        let engine = self.clone();
        let queued = artifact.clone();
        tokio::spawn(async move {
            engine.run(&queued, guard).await;
        });
        Ok(artifact)
    }

    /// Turn an audio or video payload into text and ingest it.
    ///
    /// Returns `Ok(None)` when transcription or analysis produced nothing,
    /// in which case no artifact is recorded.
    pub async fn process_media(
        &self,
        kind: SourceKind,
        mime_type: &str,
        payload: &[u8],
    ) -> Result<Option<SourceArtifact>> {
        if !matches!(kind, SourceKind::Audio | SourceKind::Video) {
            return Err(Error::Validation(format!(
                "media ingestion expects audio or video, got {}",
                kind
            )));
        }
        kind.validate_mime_type(mime_type)?;

        let _media = self.inner.tracker.begin();
        let text = match kind {
            SourceKind::Audio => self.inner.gateway.transcribe(payload, mime_type).await,
            _ => self.inner.gateway.analyze_video(payload, mime_type).await,
        };
        if text.trim().is_empty() {
            tracing::info!(%kind, mime_type, "Media produced no text, nothing recorded");
            return Ok(None);
        }

        let artifact = SourceArtifactBuilder::new(kind)
            .mime_type(mime_type)
            .content(format!("[{} ANALYSIS]: {}", kind.as_str().to_uppercase(), text))
            .metadata("bytes", serde_json::json!(payload.len()))
            .build()?;
        let artifact = self.inner.sources.append(artifact).await;
        self.announce(&artifact);

        let guard = self.inner.tracker.begin();
        self.run(&artifact, guard).await;
        Ok(Some(artifact))
    }

    /// Extract, score, merge, then maybe run the deep pass.
    async fn run(&self, artifact: &SourceArtifact, queued: QueueGuard) {
        let extraction = self.inner.gateway.extract(&artifact.content).await;

        self.inner
            .state
            .send_modify(|s| *s = apply_analysis(s, &extraction.analysis));

        let base = self.graph();
        let plan = EntityMerger::new(&self.inner.placer, self.inner.anchor).plan(
            &base,
            artifact.id,
            &extraction,
        );
        self.inner
            .graph
            .send_modify(|graph| *graph = Arc::new(graph.apply(&plan)));
        self.publish(EngineEvent::GraphMerged {
            source_id: artifact.id,
            created: plan.creations.len(),
            reinforced: plan.reinforcements.len(),
        });
        tracing::info!(
            source_id = %artifact.id,
            created = plan.creations.len(),
            reinforced = plan.reinforcements.len(),
            rigidity = extraction.analysis.rigidity,
            chaos = extraction.analysis.chaos,
            "Merged extraction"
        );
        drop(queued);

        if needs_deep_pass(extraction.analysis.rigidity, &artifact.content) {
            let _thinking = self.inner.tracker.thinking();
            let text = self.inner.gateway.deep_response(&artifact.content).await;
            tracing::debug!(source_id = %artifact.id, chars = text.len(), "Deep pass finished");
            self.publish(EngineEvent::DeepResponse {
                source_id: artifact.id,
                text,
            });
        }
    }

    // =========================================================================
    // Direct graph edits
    // =========================================================================

    /// Create a node by hand, or return the node already carrying `label`.
    pub fn add_node(&self, label: &str, category: NodeCategory) -> Result<KnowledgeNode> {
        if label.trim().is_empty() {
            return Err(Error::Validation("node label must not be empty".to_string()));
        }

        let candidate = KnowledgeNode::new(
            label,
            category,
            StreamType::Ventral,
            self.inner.placer.place_default(self.inner.anchor),
        );
        let mut resolved = None;
        self.inner.graph.send_if_modified(|graph| {
            if let Some(existing) = graph.find_by_label(label) {
                resolved = Some(existing.clone());
                return false;
            }
            let (next, _) = graph.with_node(candidate.clone());
            *graph = Arc::new(next);
            resolved = Some(candidate.clone());
            true
        });

        let node = resolved.ok_or_else(|| Error::Internal("node insertion did not run".to_string()))?;
        if node.id == candidate.id {
            self.publish(EngineEvent::NodeAdded { node_id: node.id });
        }
        Ok(node)
    }

    /// Move a node on the canvas.
    pub fn move_node(&self, id: &Uuid, x: f64, y: f64) -> Result<KnowledgeNode> {
        let mut outcome = Err(Error::NotFound(format!("node {}", id)));
        self.inner.graph.send_if_modified(|graph| {
            match graph.with_position(id, Position::new(x, y)) {
                Ok(next) => {
                    outcome = next
                        .node(id)
                        .cloned()
                        .ok_or_else(|| Error::NotFound(format!("node {}", id)));
                    *graph = Arc::new(next);
                    true
                }
                Err(e) => {
                    outcome = Err(e);
                    false
                }
            }
        });
        outcome
    }

    /// Reflect the live bridge's status in the system state.
    pub fn set_live_active(&self, active: bool) {
        self.inner
            .state
            .send_modify(|s| *s = s.with_live_active(active));
        self.publish(EngineEvent::LiveStatus { active });
    }

    // =========================================================================
    // Observation
    // =========================================================================

    pub fn state(&self) -> SystemState {
        self.inner.state.borrow().clone()
    }

    pub fn graph(&self) -> Arc<GraphSnapshot> {
        self.inner.graph.borrow().clone()
    }

    pub fn sources(&self) -> &SourceStore {
        &self.inner.sources
    }

    /// Artifacts that mentioned a node, oldest first
    pub async fn trace(&self, node_id: &Uuid) -> Result<(KnowledgeNode, Vec<SourceArtifact>)> {
        let node = self
            .graph()
            .node(node_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("node {}", node_id)))?;
        let sources = self.inner.sources.get_many(&node.source_ids).await;
        Ok((node, sources))
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SystemState> {
        self.inner.state.subscribe()
    }

    pub fn subscribe_graph(&self) -> watch::Receiver<Arc<GraphSnapshot>> {
        self.inner.graph.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<EngineEvent> {
        self.inner.events.subscribe()
    }

    /// Wait until nothing is queued and every deep pass has finished.
    pub async fn wait_until_idle(&self) {
        let mut rx = self.subscribe_state();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx
            .wait_for(|s| s.processing_queue == 0 && !s.is_thinking)
            .await;
    }

    pub fn service_name(&self) -> &str {
        self.inner.gateway.service_name()
    }

    fn announce(&self, artifact: &SourceArtifact) {
        self.publish(EngineEvent::SourceRecorded {
            source_id: artifact.id,
            kind: artifact.kind,
        });
    }

    fn publish(&self, event: EngineEvent) {
        // No subscribers is fine.
        let _ = self.inner.events.send(event);
    }
}
