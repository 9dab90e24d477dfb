//! Bridge-to-pipeline forwarding
//!
//! Every message the bridge surfaces is ingested as ordinary text, one
//! artifact per message, so voice activity goes through the same merge and
//! scoring as typed input.
//! Status changes are mirrored into `SystemState::is_live_active`.

use super::bridge::LiveEvent;
use crate::engine::SyncEngine;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Drain `events` into `engine` until every sender is dropped.
///
/// The task resolves to the number of utterances forwarded.
pub fn spawn_forwarder(engine: SyncEngine, mut events: mpsc::Receiver<LiveEvent>) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut forwarded = 0usize;
        while let Some(event) = events.recv().await {
            match event {
                LiveEvent::Message { text, is_from_user } => {
                    tracing::debug!(from_user = is_from_user, "Forwarding live utterance");
                    // Fire-and-forget, like any other ingestion
                    drop(engine.ingest(text));
                    forwarded += 1;
                }
                LiveEvent::Status { active } => engine.set_live_active(active),
            }
        }
        tracing::debug!(forwarded, "Live forwarder stopped");
        forwarded
    })
}
