//! Ingestion pipeline and processing activity tracking

mod pipeline;
mod tracker;

pub use pipeline::{
    needs_deep_pass, EngineEvent, SyncEngine, SyncEngineBuilder, DEEP_PASS_CHARS,
    DEEP_PASS_RIGIDITY,
};
pub use tracker::{ProcessingTracker, QueueGuard, ThinkingGuard};
