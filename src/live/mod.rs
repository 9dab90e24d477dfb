//! Live voice bridge
//!
//! Real-time audio session with the remote voice service. Outbound audio is
//! framed and streamed; inbound messages become discrete utterances that
//! are funneled into the ingestion pipeline.

mod bridge;
mod forwarder;
mod frame;
mod input;
mod protocol;

pub use bridge::{BridgeState, LiveBridge, LiveEvent};
pub use forwarder::spawn_forwarder;
pub use frame::{f32_to_i16, pcm_mime_type, AudioFrame, Framer};
pub use input::{AudioInput, PcmReader};
pub use protocol::{
    realtime_input, setup_message, ServerMessage, Utterance, VOICE_RESPONSE_PLACEHOLDER,
};
