//! Append-only source artifact log
//!
//! Artifacts are recorded once and never mutated or removed. Reads see a
//! newly recorded artifact as soon as `record()` returns.

use super::source::{SourceArtifact, SourceArtifactBuilder, SourceKind};
use crate::error::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct SourceLog {
    entries: Vec<SourceArtifact>,
    index: HashMap<Uuid, usize>,
}

/// In-memory append-only store for source artifacts
pub struct SourceStore {
    log: Arc<RwLock<SourceLog>>,
}

impl SourceStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            log: Arc::new(RwLock::new(SourceLog::default())),
        }
    }

    /// Validate, stamp and append a new artifact.
    pub async fn record(
        &self,
        kind: SourceKind,
        mime_type: &str,
        content: impl Into<String>,
    ) -> Result<SourceArtifact> {
        let artifact = SourceArtifactBuilder::new(kind)
            .mime_type(mime_type)
            .content(content)
            .build()?;
        Ok(self.append(artifact).await)
    }

    /// Append an already built artifact.
    pub async fn append(&self, artifact: SourceArtifact) -> SourceArtifact {
        let mut log = self.log.write().await;
        let position = log.entries.len();
        log.index.insert(artifact.id, position);
        log.entries.push(artifact.clone());
        tracing::debug!(source_id = %artifact.id, kind = %artifact.kind, "Recorded source artifact");
        artifact
    }

    /// Retrieve an artifact by ID
    pub async fn get(&self, id: &Uuid) -> Option<SourceArtifact> {
        let log = self.log.read().await;
        log.index.get(id).map(|&i| log.entries[i].clone())
    }

    /// Retrieve every artifact among `ids` that exists, in log order
    pub async fn get_many(&self, ids: &[Uuid]) -> Vec<SourceArtifact> {
        let log = self.log.read().await;
        let mut positions: Vec<usize> = ids.iter().filter_map(|id| log.index.get(id).copied()).collect();
        positions.sort_unstable();
        positions.dedup();
        positions.into_iter().map(|i| log.entries[i].clone()).collect()
    }

    /// All artifacts in creation order
    pub async fn list(&self) -> Vec<SourceArtifact> {
        self.log.read().await.entries.clone()
    }

    /// All artifacts of a given kind, in creation order
    pub async fn list_by_kind(&self, kind: SourceKind) -> Vec<SourceArtifact> {
        self.log
            .read()
            .await
            .entries
            .iter()
            .filter(|a| a.kind == kind)
            .cloned()
            .collect()
    }

    /// Number of recorded artifacts
    pub async fn len(&self) -> usize {
        self.log.read().await.entries.len()
    }

    /// Whether nothing has been recorded yet
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for SourceStore {
    fn default() -> Self {
        Self::new()
    }
}
